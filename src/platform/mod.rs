//! 平台定位
//!
//! 启动时根据运行平台解析 hostfxr 与托管入口程序集的绝对路径。

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::HostConfig;
use crate::core::{BridgeError, BridgeResult};

/// 运行平台
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Mac,
    Linux,
}

impl Platform {
    /// 当前编译目标对应的平台，不受支持的平台返回 `None`
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "windows") {
            Some(Self::Windows)
        } else if cfg!(target_os = "macos") {
            Some(Self::Mac)
        } else if cfg!(target_os = "linux") {
            Some(Self::Linux)
        } else {
            None
        }
    }

    /// 运行时目录名
    pub fn runtime_dir(&self) -> &'static str {
        match self {
            Self::Windows => "Win64",
            Self::Mac => "Mac",
            Self::Linux => "Linux",
        }
    }

    /// hostfxr 动态库文件名
    pub fn hostfxr_library_name(&self) -> &'static str {
        match self {
            Self::Windows => "hostfxr.dll",
            Self::Mac => "libhostfxr.dylib",
            Self::Linux => "libhostfxr.so",
        }
    }
}

/// 启动所需的全部路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    /// 项目根目录（绝对路径）
    pub project_root: PathBuf,
    /// hostfxr 动态库
    pub hostfxr: PathBuf,
    /// 托管框架程序集目录
    pub assemblies_dir: PathBuf,
    /// 运行时配置文件
    pub runtime_config: PathBuf,
    /// 托管运行时程序集
    pub runtime_assembly: PathBuf,
    /// 用户程序集目录
    pub user_assemblies_dir: PathBuf,
}

impl HostPaths {
    /// 解析当前平台的路径
    ///
    /// 项目根目录取自配置，缺省为当前工作目录；相对路径会被转为绝对路径。
    pub fn resolve(config: &HostConfig) -> BridgeResult<Self> {
        let platform = Platform::current().ok_or_else(|| {
            BridgeError::PathResolution(format!("unsupported platform: {}", env::consts::OS))
        })?;

        let cwd = || {
            env::current_dir().map_err(|e| {
                BridgeError::PathResolution(format!("current directory unavailable: {}", e))
            })
        };

        let root = match &config.project_root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => cwd()?.join(root),
            None => cwd()?,
        };

        Ok(Self::for_platform(&root, platform, config))
    }

    /// 按给定平台和根目录构造路径，不访问文件系统
    pub fn for_platform(root: &Path, platform: Platform, config: &HostConfig) -> Self {
        let plugin_root = root.join(&config.plugin_dir);
        let hostfxr = plugin_root
            .join("Runtime")
            .join(platform.runtime_dir())
            .join("host")
            .join("fxr")
            .join(&config.hostfxr_version)
            .join(platform.hostfxr_library_name());
        let assemblies_dir = plugin_root.join("Managed");

        Self {
            project_root: root.to_path_buf(),
            hostfxr,
            runtime_config: assemblies_dir.join(&config.runtime_config),
            runtime_assembly: assemblies_dir.join(&config.runtime_assembly),
            assemblies_dir,
            user_assemblies_dir: root.join(&config.user_assemblies_dir),
        }
    }

    /// 确保用户程序集目录存在
    ///
    /// 创建失败只记录警告，返回目录最终是否存在。
    pub fn ensure_user_assemblies_dir(&self) -> bool {
        if self.user_assemblies_dir.is_dir() {
            return true;
        }

        if let Err(e) = fs::create_dir_all(&self.user_assemblies_dir) {
            tracing::debug!(target: "platform", "create_dir_all failed: {}", e);
        }

        let exists = self.user_assemblies_dir.is_dir();
        if !exists {
            tracing::warn!(
                target: "platform",
                "Unable to create a folder for managed assemblies at {}",
                self.user_assemblies_dir.display()
            );
        }
        exists
    }
}
