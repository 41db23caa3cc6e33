//! 无头驱动：启动桥接层，运行一个游戏世界若干帧后清理退出
//!
//! 帧数由 `CLR_BRIDGE_FRAMES` 控制，缺省 60。

use std::env;

use clr_bridge::config::BridgeConfig;
use clr_bridge::framework;
use clr_bridge::runtime::{
    init_logging, Bridge, FrameScheduler, WorldCleanup, WorldContext, WorldId, WorldKind,
};
use clr_bridge::BridgeResult;

const DEFAULT_FRAMES: u64 = 60;
const FRAME_TIME: f32 = 1.0 / 60.0;

fn frame_count() -> u64 {
    env::var("CLR_BRIDGE_FRAMES")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(DEFAULT_FRAMES)
}

fn run() -> BridgeResult<()> {
    let mut config = BridgeConfig::load_or_default();
    config.apply_env_overrides();
    init_logging(&config.logging);
    config.validate()?;

    let mut bridge = Bridge::new(config);
    if let Err(e) = bridge.startup() {
        bridge.shutdown();
        return Err(e);
    }

    let mut scheduler = FrameScheduler::new();
    let world = WorldContext::new(WorldId(1), WorldKind::Game);
    scheduler.add_world(world.id);
    bridge.on_world_post_initialization(&world, &mut scheduler);

    let frames = frame_count();
    for _ in 0..frames {
        scheduler.run_frame(&mut bridge, FRAME_TIME);
        if let Some(force) = framework::exit_requested() {
            tracing::info!(target: "runtime", "Exit requested by managed code (force: {})", force);
            break;
        }
    }
    tracing::info!(
        target: "runtime",
        "Ran {} frames, {} commands dispatched",
        scheduler.frame(),
        bridge.dispatched_count()
    );

    bridge.on_world_cleanup(
        &world,
        WorldCleanup {
            session_ended: true,
            cleanup_resources: true,
        },
        &mut scheduler,
    );
    scheduler.remove_world(world.id);
    bridge.shutdown();
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Bridge failed: {}", e);
        std::process::exit(1);
    }
}
