//! 日志初始化

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// 初始化日志系统
///
/// 配置tracing日志框架；`RUST_LOG` 环境变量优先于配置中的级别。
/// 重复调用不会覆盖已安装的订阅者。
pub fn init_logging(config: &LoggingConfig) {
    if !config.log_to_console {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .try_init();
    tracing::info!(target: "runtime", "Logging initialized");
}
