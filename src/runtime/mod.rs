//! 运行时：生命周期状态机、tick 适配器与托管侧诊断回调

pub mod bridge;
pub mod diagnostics;
pub mod logging;
pub mod scheduler;
pub mod status;
pub mod tick;
pub mod world;

pub use bridge::Bridge;
pub use diagnostics::{Color, LogLevel, OnScreenMessage, OnScreenSink};
pub use logging::init_logging;
pub use scheduler::FrameScheduler;
pub use status::{StatusType, TickState};
pub use tick::{
    TickAdapter, TickAdapters, TickError, TickFunctionConfig, TickHandle, TickPhase,
    TickScheduler,
};
pub use world::{WorldCleanup, WorldContext, WorldId, WorldKind};
