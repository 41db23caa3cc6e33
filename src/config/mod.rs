/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量覆盖
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::impl_default;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 桥接层主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// 宿主库与托管程序集配置
    #[serde(default)]
    pub host: HostConfig,

    /// Tick 注册配置
    #[serde(default)]
    pub tick: TickConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("CLR_BRIDGE_PROJECT_ROOT") {
            self.host.project_root = Some(PathBuf::from(val));
        }
        if let Ok(val) = env::var("CLR_BRIDGE_HOSTFXR_VERSION") {
            self.host.hostfxr_version = val;
        }
        if let Ok(val) = env::var("CLR_BRIDGE_PLUGIN_DIR") {
            self.host.plugin_dir = val;
        }
        if let Ok(val) = env::var("CLR_BRIDGE_TICK_EVEN_WHEN_PAUSED") {
            self.tick.tick_even_when_paused =
                val.parse().unwrap_or(self.tick.tick_even_when_paused);
        }
        if let Ok(val) = env::var("CLR_BRIDGE_LOG_LEVEL") {
            if let Ok(level) = val.parse() {
                self.logging.level = level;
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.host.validate()?;
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./clr_bridge.toml
    /// 2. ./clr_bridge.json
    /// 3. <用户配置目录>/clr_bridge/config.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file("clr_bridge.toml") {
            tracing::info!(target: "config", "Loaded config from clr_bridge.toml");
            return config;
        }

        if let Ok(config) = Self::from_json_file("clr_bridge.json") {
            tracing::info!(target: "config", "Loaded config from clr_bridge.json");
            return config;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("clr_bridge").join("config.toml");

            if let Ok(config) = Self::from_toml_file(&config_path) {
                tracing::info!(target: "config", "Loaded config from {:?}", config_path);
                return config;
            }
        }

        tracing::info!(target: "config", "Using default configuration");
        Self::default()
    }
}

/// 宿主库与托管入口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// 项目根目录，缺省时使用当前工作目录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,

    /// hostfxr 版本目录
    pub hostfxr_version: String,

    /// 插件目录（相对项目根目录）
    pub plugin_dir: String,

    /// 运行时配置文件名
    pub runtime_config: String,

    /// 托管运行时程序集文件名
    pub runtime_assembly: String,

    /// 入口类型的完全限定名
    pub runtime_type_name: String,

    /// 入口方法名
    pub runtime_method_name: String,

    /// 用户程序集目录（相对项目根目录）
    pub user_assemblies_dir: String,

    /// 启动时创建用户程序集目录
    pub create_user_assemblies_dir: bool,

    /// 启动时记录函数表结构指纹
    pub log_schema_fingerprint: bool,
}

impl_default!(HostConfig {
    project_root: None,
    hostfxr_version: "6.0.1".to_string(),
    plugin_dir: "Plugins/UnrealCLR".to_string(),
    runtime_config: "UnrealEngine.Runtime.runtimeconfig.json".to_string(),
    runtime_assembly: "UnrealEngine.Runtime.dll".to_string(),
    runtime_type_name: "UnrealEngine.Runtime.Core, UnrealEngine.Runtime".to_string(),
    runtime_method_name: "ManagedCommand".to_string(),
    user_assemblies_dir: "Managed".to_string(),
    create_user_assemblies_dir: true,
    log_schema_fingerprint: false,
});

impl HostConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        let required = [
            ("hostfxr_version", &self.hostfxr_version),
            ("plugin_dir", &self.plugin_dir),
            ("runtime_config", &self.runtime_config),
            ("runtime_assembly", &self.runtime_assembly),
            ("runtime_type_name", &self.runtime_type_name),
            ("runtime_method_name", &self.runtime_method_name),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "host.{} must not be empty",
                    name
                )));
            }
        }

        if Path::new(&self.plugin_dir).is_absolute() {
            return Err(ConfigError::ValidationError(
                "host.plugin_dir must be relative to the project root".to_string(),
            ));
        }

        Ok(())
    }
}

/// Tick 函数注册配置
///
/// `run_on_any_thread` 不可配置，始终为 false。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// 暂停时是否继续 tick
    pub tick_even_when_paused: bool,

    /// 注册后立即启用
    pub start_with_tick_enabled: bool,

    /// 高优先级调度
    pub high_priority: bool,

    /// 专用服务器上是否允许 tick
    pub allow_tick_on_dedicated_server: bool,
}

impl_default!(TickConfig {
    tick_even_when_paused: false,
    start_with_tick_enabled: true,
    high_priority: true,
    allow_tick_on_dedicated_server: true,
});

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogFilterLevel,

    /// 是否输出到控制台
    pub log_to_console: bool,

    /// 是否输出 target
    pub with_target: bool,
}

impl_default!(LoggingConfig {
    level: LogFilterLevel::Info,
    log_to_console: true,
    with_target: true,
});

/// 日志过滤级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFilterLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogFilterLevel {
    /// 对应的 `EnvFilter` 指令
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogFilterLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(ConfigError::ParseError(format!(
                "unknown log level: {}",
                other
            ))),
        }
    }
}
