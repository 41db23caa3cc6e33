//! 逐帧调度器
//!
//! [`TickScheduler`] 的进程内实现：按阶段顺序执行已注册的 tick 函数。
//! 引擎宿主自带调度器时不需要它，无头运行和测试使用它驱动桥接层。

use std::collections::{BTreeMap, HashSet};

use super::bridge::Bridge;
use super::tick::{TickError, TickFunctionConfig, TickHandle, TickPhase, TickScheduler};
use super::world::WorldId;

#[derive(Debug, Clone)]
struct Registration {
    handle: TickHandle,
    config: TickFunctionConfig,
    enabled: bool,
}

/// 逐帧调度器
#[derive(Debug, Default)]
pub struct FrameScheduler {
    worlds: HashSet<WorldId>,
    registrations: BTreeMap<(TickPhase, u64), Registration>,
    next_id: u64,
    paused: bool,
    dedicated_server: bool,
    frame: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明一个可以接受 tick 注册的世界
    pub fn add_world(&mut self, world: WorldId) {
        self.worlds.insert(world);
    }

    /// 移除世界及其全部注册
    pub fn remove_world(&mut self, world: WorldId) {
        self.worlds.remove(&world);
        self.registrations.retain(|_, r| r.handle.world != world);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn set_dedicated_server(&mut self, dedicated_server: bool) {
        self.dedicated_server = dedicated_server;
    }

    /// 启用或停用一个已注册的 tick 函数，停用后保留注册但不再执行
    pub fn set_enabled(&mut self, handle: TickHandle, enabled: bool) {
        if let Some(registration) = self.registrations.get_mut(&(handle.phase, handle.id)) {
            registration.enabled = enabled;
        }
    }

    /// 某个世界已注册的阶段，按执行顺序
    pub fn registered_phases(&self, world: WorldId) -> Vec<TickPhase> {
        self.registrations
            .values()
            .filter(|r| r.handle.world == world)
            .map(|r| r.handle.phase)
            .collect()
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// 执行一帧，返回实际执行的 tick 函数数量
    pub fn run_frame(&mut self, bridge: &mut Bridge, delta_time: f32) -> usize {
        self.frame += 1;

        let due: Vec<TickPhase> = self
            .registrations
            .values()
            .filter(|r| r.enabled)
            .filter(|r| !self.paused || r.config.tick_even_when_paused)
            .filter(|r| !self.dedicated_server || r.config.allow_tick_on_dedicated_server)
            .map(|r| r.handle.phase)
            .collect();

        for phase in &due {
            bridge.execute_tick(*phase, delta_time);
        }

        tracing::trace!(target: "runtime", "Frame {}: {} tick functions", self.frame, due.len());
        due.len()
    }
}

impl TickScheduler for FrameScheduler {
    fn register(
        &mut self,
        world: WorldId,
        config: &TickFunctionConfig,
    ) -> Result<TickHandle, TickError> {
        if !self.worlds.contains(&world) {
            return Err(TickError::UnknownWorld(world));
        }
        if config.run_on_any_thread {
            return Err(TickError::Rejected(
                "worker-thread ticking is not supported".to_string(),
            ));
        }
        if !config.can_ever_tick {
            return Err(TickError::Rejected("tick function can never tick".to_string()));
        }

        let registered = self.registered_phases(world);
        if registered.contains(&config.phase) {
            return Err(TickError::AlreadyRegistered(config.phase));
        }
        if let Some(prerequisite) = config.prerequisite {
            if !registered.contains(&prerequisite) {
                return Err(TickError::MissingPrerequisite {
                    phase: config.phase,
                    prerequisite,
                });
            }
        }

        let handle = TickHandle {
            world,
            phase: config.phase,
            id: self.next_id,
        };
        self.next_id += 1;

        self.registrations.insert(
            (config.phase, handle.id),
            Registration {
                handle,
                config: *config,
                enabled: config.start_with_tick_enabled,
            },
        );

        Ok(handle)
    }

    fn unregister(&mut self, handle: TickHandle) {
        self.registrations.remove(&(handle.phase, handle.id));
    }
}
