//! 桥接上下文
//!
//! 持有宿主加载器、函数表、事件槽位、运行状态和 tick 适配器，
//! 负责在世界生命周期事件和 tick 回调中决定何时可以跨边界分发命令。
//!
//! 单线程约束：所有方法都只应在外部调度器的主更新线程上调用。
//! 这里没有锁，托管侧通过事件槽位写入的地址也只在这个线程上读取。

use std::ffi::c_void;
use std::time::Duration;

use super::diagnostics::{
    self, runtime_exception, runtime_log, take_fatal_report, Color, LogLevel, OnScreenMessage,
};
use super::status::{StatusType, TickState};
use super::tick::{TickAdapters, TickPhase, TickScheduler};
use super::world::{WorldCleanup, WorldContext, WorldId};
use crate::config::BridgeConfig;
use crate::core::{BridgeError, BridgeResult};
use crate::framework;
use crate::host::HostLoader;
use crate::interop::{
    Checksum, Command, Dispatcher, EventKind, EventSlots, FunctionTable, InitReferences,
    RawResult, RuntimeFunctions,
};

/// 宿主未初始化提示的显示时长
const NOT_INITIALIZED_DISPLAY_TIME: Duration = Duration::from_secs(5);

/// 桥接上下文
pub struct Bridge {
    config: BridgeConfig,
    loader: HostLoader,
    dispatcher: Option<Dispatcher>,
    table: Option<FunctionTable>,
    checksum: Option<Checksum>,
    events: EventSlots,
    runtime_functions: RuntimeFunctions,
    status: StatusType,
    tick_state: TickState,
    world: Option<WorldId>,
    adapters: TickAdapters,
    startup_attempted: bool,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        let loader = HostLoader::new(config.host.clone());
        Self::with_loader(config, loader)
    }

    /// 使用指定的宿主加载器
    pub fn with_loader(config: BridgeConfig, loader: HostLoader) -> Self {
        let adapters = TickAdapters::new(&config.tick);
        diagnostics::bind_bridge_thread();
        Self {
            config,
            loader,
            dispatcher: None,
            table: None,
            checksum: None,
            events: EventSlots::new(),
            runtime_functions: RuntimeFunctions::new(
                runtime_exception as *mut c_void,
                runtime_log as *mut c_void,
            ),
            status: StatusType::Stopped,
            tick_state: TickState::Stopped,
            world: None,
            adapters,
            startup_attempted: false,
        }
    }

    /// 启动桥接层
    ///
    /// 只执行一次。失败时以错误级别记录失败的步骤，状态保持 `Stopped`，
    /// 之后再调用直接返回 [`BridgeError::NotInitialized`]。
    pub fn startup(&mut self) -> BridgeResult<()> {
        if self.startup_attempted {
            return match self.status {
                StatusType::Stopped => Err(BridgeError::NotInitialized),
                _ => Ok(()),
            };
        }
        self.startup_attempted = true;

        self.try_startup().map_err(|e| {
            tracing::error!(target: "host", "Bridge startup failed during {}: {}", e.step(), e);
            e
        })
    }

    fn try_startup(&mut self) -> BridgeResult<()> {
        let entry = self.loader.initialize()?;

        if let Some(paths) = self.loader.paths() {
            if self.config.host.create_user_assemblies_dir {
                paths.ensure_user_assemblies_dir();
            }
            framework::configure_project(&paths.project_root);
        }

        let (table, checksum) = FunctionTable::build(framework::function_groups());
        if self.config.host.log_schema_fingerprint {
            tracing::info!(target: "interop", "Function table fingerprint: {}", table.fingerprint());
        }

        let references = InitReferences {
            runtime_functions: self.runtime_functions.as_ptr(),
            events: self.events.as_ptr(),
            functions: table.as_ptr(),
        };

        let dispatcher = Dispatcher::new(entry);
        dispatcher.initialize(&references, checksum)?;
        // 初始化期间的 Fatal 上报不影响 Stopped → Idle
        take_fatal_report();

        self.table = Some(table);
        self.checksum = Some(checksum);
        self.dispatcher = Some(dispatcher);
        self.status = StatusType::Idle;
        tracing::info!(target: "runtime", "Bridge is idle");
        Ok(())
    }

    /// 释放宿主库，启动失败后调用也是安全的
    ///
    /// 世界仍处于注册状态时不会通知托管侧；随后的 [`Bridge::on_world_cleanup`]
    /// 仍会注销 tick 函数并清零事件槽位。
    pub fn shutdown(&mut self) {
        if self.tick_state != TickState::Stopped {
            tracing::warn!(
                target: "runtime",
                "Shutting down while {:?} is still registered",
                self.world
            );
        }
        self.dispatcher = None;
        self.status = StatusType::Stopped;
        self.loader.shutdown();
    }

    /// 世界初始化完成
    pub fn on_world_post_initialization(
        &mut self,
        world: &WorldContext,
        scheduler: &mut dyn TickScheduler,
    ) {
        if !world.is_game_world() {
            return;
        }

        if self.status == StatusType::Stopped {
            tracing::warn!(target: "runtime", "Host is not initialized");
            diagnostics::add_on_screen_message(OnScreenMessage::new(
                NOT_INITIALIZED_DISPLAY_TIME,
                Color::YELLOW,
                "Host is not initialized",
            ));
            return;
        }

        if self.tick_state != TickState::Stopped {
            tracing::debug!(
                target: "runtime",
                "Ignoring world {:?}: world {:?} is already registered",
                world.id,
                self.world
            );
            return;
        }

        self.dispatch(&Command::LoadAssemblies);
        self.status = StatusType::Running;

        if let Err(e) = self.adapters.register_all(scheduler, world.id) {
            tracing::error!(target: "runtime", "Tick registration failed for {:?}: {}", world.id, e);
            self.dispatch(&Command::UnloadAssemblies);
            self.status = StatusType::Idle;
            self.events.clear();
            return;
        }

        self.world = Some(world.id);
        self.tick_state = TickState::Registered;
        self.fire_event(EventKind::OnWorldBegin);
    }

    /// 世界清理
    pub fn on_world_cleanup(
        &mut self,
        world: &WorldContext,
        cleanup: WorldCleanup,
        scheduler: &mut dyn TickScheduler,
    ) {
        if !world.is_game_world()
            || self.world != Some(world.id)
            || self.tick_state == TickState::Stopped
        {
            return;
        }

        tracing::debug!(
            target: "runtime",
            "Cleaning up {:?} (session ended: {}, cleanup resources: {})",
            world.id,
            cleanup.session_ended,
            cleanup.cleanup_resources
        );

        if self.status != StatusType::Stopped {
            self.fire_event(EventKind::OnWorldEnd);
            self.adapters.unregister_all(scheduler);
            self.dispatch(&Command::UnloadAssemblies);
            self.status = StatusType::Idle;
        } else {
            // 桥接层已关闭，不再通知托管侧，但注册必须撤销
            self.adapters.unregister_all(scheduler);
        }

        self.world = None;
        self.tick_state = TickState::Stopped;
        self.events.clear();
    }

    /// 调度器回调：执行某个阶段的 tick
    pub fn execute_tick(&mut self, phase: TickPhase, delta_time: f32) {
        if !self.adapters.get(phase).is_registered() {
            return;
        }

        if phase == TickPhase::PrePhysics && self.tick_state == TickState::Registered {
            self.fire_event(EventKind::OnWorldPostBegin);
            self.tick_state = TickState::Started;
        }

        let Some(function) = self.events.get(phase.event_kind()) else {
            return;
        };
        self.dispatch(&Command::InvokeTimed {
            function,
            delta_time,
        });
    }

    fn fire_event(&mut self, kind: EventKind) {
        if let Some(function) = self.events.get(kind) {
            self.dispatch(&Command::Invoke { function });
        }
    }

    /// 分发命令，返回后处理托管侧在调用期间上报的 Fatal
    fn dispatch(&mut self, command: &Command<'_>) -> Option<RawResult> {
        let result = self.dispatcher.as_ref()?.dispatch(command);
        if take_fatal_report() {
            self.demote_on_fatal();
        }
        Some(result)
    }

    fn demote_on_fatal(&mut self) {
        if self.status == StatusType::Running {
            tracing::warn!(target: "runtime", "Managed code reported a fatal error, bridge is idle");
            self.status = StatusType::Idle;
        }
    }

    /// 处理托管侧日志，Fatal 会把 `Running` 降为 `Idle`
    ///
    /// Error 与 Fatal 以 [`BridgeError::ManagedReportedLog`] 返回给宿主。
    pub fn handle_managed_log(&mut self, level: LogLevel, message: &str) -> Option<BridgeError> {
        diagnostics::managed_log(level, message);
        if take_fatal_report() {
            self.demote_on_fatal();
        }

        matches!(level, LogLevel::Error | LogLevel::Fatal).then(|| {
            BridgeError::ManagedReportedLog {
                level,
                message: message.to_string(),
            }
        })
    }

    /// 处理托管侧异常，不改变运行状态
    pub fn handle_managed_exception(&mut self, message: &str) -> BridgeError {
        diagnostics::managed_exception(message);
        BridgeError::ManagedReportedException(message.to_string())
    }

    pub fn status(&self) -> StatusType {
        self.status
    }

    pub fn tick_state(&self) -> TickState {
        self.tick_state
    }

    pub fn is_running(&self) -> bool {
        self.status == StatusType::Running
    }

    /// 托管侧写入的事件槽位
    pub fn events(&self) -> &EventSlots {
        &self.events
    }

    pub fn checksum(&self) -> Option<Checksum> {
        self.checksum
    }

    pub fn table(&self) -> Option<&FunctionTable> {
        self.table.as_ref()
    }

    /// 已发往托管入口的命令数
    pub fn dispatched_count(&self) -> u64 {
        self.dispatcher.as_ref().map_or(0, Dispatcher::dispatched)
    }

    pub fn world(&self) -> Option<WorldId> {
        self.world
    }

    pub fn adapters(&self) -> &TickAdapters {
        &self.adapters
    }

    pub fn loader(&self) -> &HostLoader {
        &self.loader
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("status", &self.status)
            .field("tick_state", &self.tick_state)
            .field("world", &self.world)
            .field("checksum", &self.checksum)
            .finish_non_exhaustive()
    }
}
