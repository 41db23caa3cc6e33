//! Tick 适配器
//!
//! 四个适配器分别绑定外部调度器的一个阶段。阶段顺序
//! pre-physics < during-physics < post-physics < post-update，
//! 每个适配器把前一阶段声明为前置依赖。

use thiserror::Error;

use super::world::WorldId;
use crate::config::TickConfig;
use crate::interop::EventKind;

/// 调度阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TickPhase {
    PrePhysics,
    DuringPhysics,
    PostPhysics,
    PostUpdate,
}

impl TickPhase {
    pub const ALL: [TickPhase; 4] = [
        TickPhase::PrePhysics,
        TickPhase::DuringPhysics,
        TickPhase::PostPhysics,
        TickPhase::PostUpdate,
    ];

    /// 该阶段触发的托管事件
    pub fn event_kind(self) -> EventKind {
        match self {
            TickPhase::PrePhysics => EventKind::OnWorldPrePhysicsTick,
            TickPhase::DuringPhysics => EventKind::OnWorldDuringPhysicsTick,
            TickPhase::PostPhysics => EventKind::OnWorldPostPhysicsTick,
            TickPhase::PostUpdate => EventKind::OnWorldPostUpdateTick,
        }
    }

    /// 前置阶段
    pub fn prerequisite(self) -> Option<TickPhase> {
        match self {
            TickPhase::PrePhysics => None,
            TickPhase::DuringPhysics => Some(TickPhase::PrePhysics),
            TickPhase::PostPhysics => Some(TickPhase::DuringPhysics),
            TickPhase::PostUpdate => Some(TickPhase::PostPhysics),
        }
    }

    pub fn diagnostic_message(self) -> &'static str {
        match self {
            TickPhase::PrePhysics => "PrePhysicsTickFunction",
            TickPhase::DuringPhysics => "DuringPhysicsTickFunction",
            TickPhase::PostPhysics => "PostPhysicsTickFunction",
            TickPhase::PostUpdate => "PostUpdateTickFunction",
        }
    }
}

/// 向调度器注册时提交的 tick 函数描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickFunctionConfig {
    pub phase: TickPhase,
    pub prerequisite: Option<TickPhase>,
    pub can_ever_tick: bool,
    pub tick_even_when_paused: bool,
    pub start_with_tick_enabled: bool,
    pub high_priority: bool,
    pub allow_tick_on_dedicated_server: bool,
    /// 始终为 false：所有分发都必须在主更新线程上进行
    pub run_on_any_thread: bool,
}

impl TickFunctionConfig {
    pub fn new(phase: TickPhase, config: &TickConfig) -> Self {
        Self {
            phase,
            prerequisite: phase.prerequisite(),
            can_ever_tick: true,
            tick_even_when_paused: config.tick_even_when_paused,
            start_with_tick_enabled: config.start_with_tick_enabled,
            high_priority: config.high_priority,
            allow_tick_on_dedicated_server: config.allow_tick_on_dedicated_server,
            run_on_any_thread: false,
        }
    }
}

/// 调度器返回的注册句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle {
    pub world: WorldId,
    pub phase: TickPhase,
    pub id: u64,
}

/// Tick 注册错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TickError {
    #[error("World {0:?} is not known to the scheduler")]
    UnknownWorld(WorldId),
    #[error("{0:?} is already registered")]
    AlreadyRegistered(TickPhase),
    #[error("{phase:?} requires {prerequisite:?} to be registered first")]
    MissingPrerequisite {
        phase: TickPhase,
        prerequisite: TickPhase,
    },
    #[error("Tick function rejected: {0}")]
    Rejected(String),
}

/// 外部的逐帧调度器
pub trait TickScheduler {
    fn register(
        &mut self,
        world: WorldId,
        config: &TickFunctionConfig,
    ) -> Result<TickHandle, TickError>;

    fn unregister(&mut self, handle: TickHandle);
}

/// 单个阶段的 tick 适配器
#[derive(Debug, Clone)]
pub struct TickAdapter {
    config: TickFunctionConfig,
    handle: Option<TickHandle>,
}

impl TickAdapter {
    pub fn new(phase: TickPhase, config: &TickConfig) -> Self {
        Self {
            config: TickFunctionConfig::new(phase, config),
            handle: None,
        }
    }

    pub fn phase(&self) -> TickPhase {
        self.config.phase
    }

    pub fn config(&self) -> &TickFunctionConfig {
        &self.config
    }

    pub fn handle(&self) -> Option<TickHandle> {
        self.handle
    }

    pub fn is_registered(&self) -> bool {
        self.handle.is_some()
    }

    pub fn register(
        &mut self,
        scheduler: &mut dyn TickScheduler,
        world: WorldId,
    ) -> Result<(), TickError> {
        if self.handle.is_some() {
            return Err(TickError::AlreadyRegistered(self.phase()));
        }
        self.handle = Some(scheduler.register(world, &self.config)?);
        Ok(())
    }

    pub fn unregister(&mut self, scheduler: &mut dyn TickScheduler) {
        if let Some(handle) = self.handle.take() {
            scheduler.unregister(handle);
        }
    }

    pub fn diagnostic_message(&self) -> &'static str {
        self.phase().diagnostic_message()
    }
}

/// 四个适配器
#[derive(Debug, Clone)]
pub struct TickAdapters {
    adapters: [TickAdapter; 4],
}

impl TickAdapters {
    pub fn new(config: &TickConfig) -> Self {
        Self {
            adapters: TickPhase::ALL.map(|phase| TickAdapter::new(phase, config)),
        }
    }

    pub fn get(&self, phase: TickPhase) -> &TickAdapter {
        &self.adapters[phase as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &TickAdapter> {
        self.adapters.iter()
    }

    /// 按阶段顺序注册；任一失败时撤销已注册的适配器
    pub fn register_all(
        &mut self,
        scheduler: &mut dyn TickScheduler,
        world: WorldId,
    ) -> Result<(), TickError> {
        for index in 0..self.adapters.len() {
            if let Err(e) = self.adapters[index].register(scheduler, world) {
                self.unregister_all(scheduler);
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn unregister_all(&mut self, scheduler: &mut dyn TickScheduler) {
        for adapter in self.adapters.iter_mut() {
            adapter.unregister(scheduler);
        }
    }

    pub fn any_registered(&self) -> bool {
        self.adapters.iter().any(TickAdapter::is_registered)
    }
}
