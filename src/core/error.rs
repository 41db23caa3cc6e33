//! 统一错误处理模块
//!
//! 桥接层范围内的错误类型定义
//!
//! ## 错误分层
//!
//! - **宿主加载错误**: 路径解析、库加载、入口点解析、运行时初始化。
//!   全部是终止性的，失败后桥接层在本进程生命周期内保持 `Stopped`。
//! - **托管握手错误**: 初始化命令返回值与哨兵不符。
//! - **托管上报**: 托管代码通过运行时回调上报的异常和日志，仅在本地恢复。

use thiserror::Error;

use crate::config::ConfigError;
use crate::runtime::diagnostics::LogLevel;

/// 桥接层核心错误类型
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Unable to resolve host paths: {0}")]
    PathResolution(String),

    #[error("Host library loading failed: {path}, reason: {reason}")]
    LibraryLoad { path: String, reason: String },

    #[error("Unable to locate {0} entry point")]
    EntryPointMissing(&'static str),

    #[error("Unable to initialize the host from {0}")]
    RuntimeInit(String),

    #[error("Unable to get hdt_load_assembly_and_get_function_pointer runtime delegate")]
    DelegateResolution,

    #[error("Host runtime assembly loading failed: {method} in {type_name} (code {code:#x})")]
    ManagedEntryPoint {
        type_name: String,
        method: String,
        code: i32,
    },

    #[error("Host runtime assembly initialization failed: expected {expected:#x}, got {actual:#x}")]
    ManagedInitMismatch { expected: isize, actual: isize },

    #[error("Managed exception: {0}")]
    ManagedReportedException(String),

    #[error("Managed log ({level:?}): {message}")]
    ManagedReportedLog { level: LogLevel, message: String },

    #[error("Bridge is not initialized")]
    NotInitialized,

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl BridgeError {
    /// 失败的启动步骤名称，用于一次性的错误日志
    pub fn step(&self) -> &'static str {
        match self {
            Self::PathResolution(_) => "path resolution",
            Self::LibraryLoad { .. } => "library load",
            Self::EntryPointMissing(_) => "entry point lookup",
            Self::RuntimeInit(_) => "runtime initialization",
            Self::DelegateResolution => "delegate resolution",
            Self::ManagedEntryPoint { .. } => "managed entry point",
            Self::ManagedInitMismatch { .. } => "managed initialization",
            Self::ManagedReportedException(_) | Self::ManagedReportedLog { .. } => "managed report",
            Self::NotInitialized => "dispatch",
            Self::Config(_) => "configuration",
        }
    }

    /// 是否属于宿主加载阶段的终止性错误
    pub fn is_host_failure(&self) -> bool {
        matches!(
            self,
            Self::PathResolution(_)
                | Self::LibraryLoad { .. }
                | Self::EntryPointMissing(_)
                | Self::RuntimeInit(_)
                | Self::DelegateResolution
                | Self::ManagedEntryPoint { .. }
        )
    }
}

/// 桥接层结果类型别名
pub type BridgeResult<T> = Result<T, BridgeError>;
