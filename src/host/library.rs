//! 宿主库符号来源
//!
//! 对动态库的唯一要求是按名称查找导出地址。真实实现基于 `libloading`，
//! 测试可以提供桩实现。

use std::ffi::c_void;
use std::path::Path;

use libloading::Library;

/// 已加载的宿主库
pub trait HostLibrary {
    /// 查找导出符号，缺失或为空时返回 `None`
    fn symbol(&self, name: &str) -> Option<*mut c_void>;
}

impl HostLibrary for Library {
    fn symbol(&self, name: &str) -> Option<*mut c_void> {
        // SAFETY: 仅读取符号地址，不按任何类型调用。
        let symbol = unsafe { self.get::<*mut c_void>(name.as_bytes()) }.ok()?;
        let address = *symbol;
        (!address.is_null()).then_some(address)
    }
}

/// 打开宿主库的方式
pub type LibraryOpener = Box<dyn Fn(&Path) -> Result<Box<dyn HostLibrary>, String>>;

/// 使用 `libloading` 打开动态库
pub fn open_dynamic_library(path: &Path) -> Result<Box<dyn HostLibrary>, String> {
    if !path.exists() {
        return Err(format!("file not found: {}", path.display()));
    }

    // SAFETY: 加载 hostfxr 会执行其初始化代码，这是宿主库的既定契约。
    let library = unsafe { Library::new(path) }.map_err(|e| e.to_string())?;
    Ok(Box::new(library))
}
