//! # CLR Bridge
//!
//! 把托管运行时嵌入宿主程序的原生桥接层。
//!
//! ## Features
//!
//! - **Host Loader**: 通过 hostfxr 启动托管运行时并解析唯一的托管入口函数
//! - **Function Table**: 按固定顺序导出引擎 API，并以校验和验证双方的表结构
//! - **Command Dispatch**: 所有跨边界调用都经由一条带判别值的命令
//! - **Lifecycle**: `Stopped`/`Idle`/`Running` 状态机与按世界的 tick 状态
//! - **Tick Adapters**: 四个阶段的调度回调，把每帧时间转发给托管侧
//!
//! ## Threading
//!
//! 桥接层是单线程的：命令分发、事件槽位读写、状态迁移都发生在外部调度器的
//! 主更新线程上。托管侧在分发调用中挂起会让当前帧一直挂起，没有超时机制。
//!
//! ### Example
//!
//! ```ignore
//! use clr_bridge::config::BridgeConfig;
//! use clr_bridge::runtime::{Bridge, FrameScheduler, WorldContext, WorldId, WorldKind};
//!
//! let mut bridge = Bridge::new(BridgeConfig::load_or_default());
//! bridge.startup()?;
//!
//! let mut scheduler = FrameScheduler::new();
//! let world = WorldContext::new(WorldId(1), WorldKind::Game);
//! scheduler.add_world(world.id);
//! bridge.on_world_post_initialization(&world, &mut scheduler);
//! scheduler.run_frame(&mut bridge, 1.0 / 60.0);
//! ```
//!
//! ## Modules
//!
//! - [`config`]: 配置加载
//! - [`platform`]: 平台路径定位
//! - [`host`]: hostfxr 加载
//! - [`interop`]: 函数表、事件槽位和命令分发
//! - [`framework`]: 函数表中的引擎 API
//! - [`runtime`]: 桥接上下文、状态机与 tick 适配器

/// Error types and shared macros
#[macro_use]
pub mod core;
/// Bridge configuration
pub mod config;
/// Engine API functions exposed through the function table
pub mod framework;
/// Hosting library loader
pub mod host;
/// Native/managed interop protocol
pub mod interop;
/// Platform path resolution
pub mod platform;
/// Lifecycle, tick adapters and managed diagnostics
pub mod runtime;

pub use crate::core::{BridgeError, BridgeResult};
pub use crate::runtime::Bridge;
