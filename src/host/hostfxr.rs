//! hostfxr ABI
//!
//! 宿主库导出函数的签名与常量。字符串参数使用平台的 `char_t`：
//! Windows 上为 UTF-16，其余平台为 UTF-8。

use std::ffi::{c_void, OsStr};

#[cfg(windows)]
pub type CharT = u16;
#[cfg(not(windows))]
pub type CharT = std::ffi::c_char;

pub type HostfxrHandle = *mut c_void;

pub type ErrorWriterFn = unsafe extern "C" fn(message: *const CharT);

pub type SetErrorWriterFn =
    unsafe extern "C" fn(error_writer: Option<ErrorWriterFn>) -> Option<ErrorWriterFn>;

pub type InitializeForRuntimeConfigFn = unsafe extern "C" fn(
    runtime_config_path: *const CharT,
    parameters: *const InitializeParameters,
    host_context_handle: *mut HostfxrHandle,
) -> i32;

pub type GetRuntimeDelegateFn = unsafe extern "C" fn(
    host_context_handle: HostfxrHandle,
    delegate_type: DelegateType,
    delegate: *mut *mut c_void,
) -> i32;

pub type CloseFn = unsafe extern "C" fn(host_context_handle: HostfxrHandle) -> i32;

pub type LoadAssemblyAndGetFunctionPointerFn = unsafe extern "C" fn(
    assembly_path: *const CharT,
    type_name: *const CharT,
    method_name: *const CharT,
    delegate_type_name: *const CharT,
    reserved: *mut c_void,
    delegate: *mut *mut c_void,
) -> i32;

/// `hostfxr_initialize_parameters`
#[repr(C)]
pub struct InitializeParameters {
    pub size: usize,
    pub host_path: *const CharT,
    pub dotnet_root: *const CharT,
}

/// `hostfxr_delegate_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum DelegateType {
    ComActivation = 0,
    LoadInMemoryAssembly = 1,
    WinrtActivation = 2,
    ComRegister = 3,
    ComUnregister = 4,
    LoadAssemblyAndGetFunctionPointer = 5,
    GetFunctionPointer = 6,
}

/// 目标方法标注了 `UnmanagedCallersOnly`，此时不需要委托类型名
pub const UNMANAGEDCALLERSONLY_METHOD: *const CharT = usize::MAX as *const CharT;

pub const SET_ERROR_WRITER: &str = "hostfxr_set_error_writer";
pub const INITIALIZE_FOR_RUNTIME_CONFIG: &str = "hostfxr_initialize_for_runtime_config";
pub const GET_RUNTIME_DELEGATE: &str = "hostfxr_get_runtime_delegate";
pub const CLOSE: &str = "hostfxr_close";

/// 以 NUL 结尾的平台字符串
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostString(Vec<CharT>);

impl HostString {
    /// 转换失败（内部含 NUL）时返回 `None`
    #[cfg(not(windows))]
    pub fn new(value: impl AsRef<OsStr>) -> Option<Self> {
        use std::os::unix::ffi::OsStrExt;

        let bytes = value.as_ref().as_bytes();
        if bytes.contains(&0) {
            return None;
        }
        let mut chars: Vec<CharT> = bytes.iter().map(|&b| b as CharT).collect();
        chars.push(0);
        Some(Self(chars))
    }

    #[cfg(windows)]
    pub fn new(value: impl AsRef<OsStr>) -> Option<Self> {
        use std::os::windows::ffi::OsStrExt;

        let mut chars: Vec<CharT> = value.as_ref().encode_wide().collect();
        if chars.contains(&0) {
            return None;
        }
        chars.push(0);
        Some(Self(chars))
    }

    pub fn as_ptr(&self) -> *const CharT {
        self.0.as_ptr()
    }
}

/// 读取宿主传入的 NUL 结尾字符串
///
/// # Safety
/// `message` 必须为空或指向以 NUL 结尾的 `char_t` 序列。
pub unsafe fn read_host_string(message: *const CharT) -> String {
    if message.is_null() {
        return String::new();
    }

    #[cfg(not(windows))]
    {
        std::ffi::CStr::from_ptr(message).to_string_lossy().into_owned()
    }

    #[cfg(windows)]
    {
        let mut len = 0;
        while *message.add(len) != 0 {
            len += 1;
        }
        String::from_utf16_lossy(std::slice::from_raw_parts(message, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_string_is_nul_terminated() {
        let s = HostString::new("ManagedCommand").unwrap();
        let read = unsafe { read_host_string(s.as_ptr()) };
        assert_eq!(read, "ManagedCommand");
    }

    #[test]
    fn test_host_string_rejects_interior_nul() {
        assert!(HostString::new("Managed\0Command").is_none());
    }

    #[test]
    fn test_null_message_reads_empty() {
        assert_eq!(unsafe { read_host_string(std::ptr::null()) }, "");
    }

    #[test]
    fn test_delegate_type_value() {
        assert_eq!(DelegateType::LoadAssemblyAndGetFunctionPointer as i32, 5);
    }
}
