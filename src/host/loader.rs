//! 宿主加载
//!
//! 加载 hostfxr、解析四个固定入口、以运行时配置初始化宿主上下文，
//! 取得 `load_assembly_and_get_function_pointer` 委托并用它解析托管入口函数。
//! 每一步失败都是终止性的，不重试。失败后已加载的库句柄保留到关闭时释放。

use std::ffi::c_void;
use std::path::Path;
use std::ptr;

use super::hostfxr::{
    self, read_host_string, CharT, CloseFn, DelegateType, GetRuntimeDelegateFn, HostString,
    HostfxrHandle, InitializeForRuntimeConfigFn, LoadAssemblyAndGetFunctionPointerFn,
    SetErrorWriterFn, UNMANAGEDCALLERSONLY_METHOD,
};
use super::library::{open_dynamic_library, HostLibrary, LibraryOpener};
use crate::config::HostConfig;
use crate::core::{BridgeError, BridgeResult};
use crate::interop::ManagedEntryPoint;
use crate::platform::HostPaths;

/// hostfxr 的四个必需入口
#[derive(Clone, Copy)]
pub struct HostEntryPoints {
    pub set_error_writer: SetErrorWriterFn,
    pub initialize_for_runtime_config: InitializeForRuntimeConfigFn,
    pub get_runtime_delegate: GetRuntimeDelegateFn,
    pub close: CloseFn,
}

impl HostEntryPoints {
    /// 按固定顺序逐个解析，第一个缺失的入口即失败
    pub fn resolve(library: &dyn HostLibrary) -> BridgeResult<Self> {
        let lookup = |name: &'static str| {
            library
                .symbol(name)
                .ok_or(BridgeError::EntryPointMissing(name))
        };

        // SAFETY: 地址来自 hostfxr 的同名导出，签名由 hostfxr.h 约定。
        unsafe {
            let set_error_writer = lookup(hostfxr::SET_ERROR_WRITER)?;
            let initialize_for_runtime_config = lookup(hostfxr::INITIALIZE_FOR_RUNTIME_CONFIG)?;
            let get_runtime_delegate = lookup(hostfxr::GET_RUNTIME_DELEGATE)?;
            let close = lookup(hostfxr::CLOSE)?;

            Ok(Self {
                set_error_writer: std::mem::transmute::<*mut c_void, SetErrorWriterFn>(
                    set_error_writer,
                ),
                initialize_for_runtime_config: std::mem::transmute::<
                    *mut c_void,
                    InitializeForRuntimeConfigFn,
                >(initialize_for_runtime_config),
                get_runtime_delegate: std::mem::transmute::<*mut c_void, GetRuntimeDelegateFn>(
                    get_runtime_delegate,
                ),
                close: std::mem::transmute::<*mut c_void, CloseFn>(close),
            })
        }
    }
}

/// 宿主上下文，离开作用域时关闭
struct HostContext {
    handle: HostfxrHandle,
    close: CloseFn,
}

impl Drop for HostContext {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            // SAFETY: 句柄由 initialize_for_runtime_config 返回，只关闭一次。
            unsafe {
                (self.close)(self.handle);
            }
            tracing::debug!(target: "host", "Host context closed");
        }
    }
}

/// hostfxr 错误输出回调，转发到日志
pub unsafe extern "C" fn host_error_writer(message: *const CharT) {
    let message = read_host_string(message);
    tracing::error!(target: "host", "{}", message);
}

/// 解析托管入口所需的全部字符串
struct ManagedTarget {
    runtime_config: HostString,
    assembly: HostString,
    type_name: HostString,
    method_name: HostString,
}

impl ManagedTarget {
    fn new(paths: &HostPaths, config: &HostConfig) -> BridgeResult<Self> {
        let convert = |what: &str, value: &std::ffi::OsStr| {
            HostString::new(value).ok_or_else(|| {
                BridgeError::PathResolution(format!("{} contains an interior NUL", what))
            })
        };

        Ok(Self {
            runtime_config: convert("runtime config path", paths.runtime_config.as_os_str())?,
            assembly: convert("runtime assembly path", paths.runtime_assembly.as_os_str())?,
            type_name: convert("runtime type name", config.runtime_type_name.as_ref())?,
            method_name: convert("runtime method name", config.runtime_method_name.as_ref())?,
        })
    }
}

/// 宿主加载器
pub struct HostLoader {
    config: HostConfig,
    opener: LibraryOpener,
    paths: Option<HostPaths>,
    library: Option<Box<dyn HostLibrary>>,
}

impl HostLoader {
    pub fn new(config: HostConfig) -> Self {
        Self::with_opener(config, Box::new(open_dynamic_library))
    }

    /// 使用自定义的库打开方式
    pub fn with_opener(config: HostConfig, opener: LibraryOpener) -> Self {
        Self {
            config,
            opener,
            paths: None,
            library: None,
        }
    }

    /// 执行完整的宿主加载流程
    pub fn initialize(&mut self) -> BridgeResult<ManagedEntryPoint> {
        let paths = HostPaths::resolve(&self.config)?;
        tracing::info!(target: "host", "Host path set to \"{}\"", paths.hostfxr.display());
        let target = ManagedTarget::new(&paths, &self.config)?;
        self.paths = Some(paths.clone());

        let library = self.open(&paths.hostfxr)?;
        tracing::info!(target: "host", "Host library loaded successfully");

        let entry_points = HostEntryPoints::resolve(library)?;

        // SAFETY: 回调为 'static 函数，签名与 hostfxr_error_writer_fn 一致。
        unsafe {
            (entry_points.set_error_writer)(Some(host_error_writer));
        }

        let load_assembly = {
            let context = Self::initialize_context(&entry_points, &target)?;
            Self::load_assembly_delegate(&entry_points, &context)?
        };
        tracing::info!(target: "host", "Host functions loaded successfully");

        let entry = self.resolve_managed_entry(load_assembly, &target)?;
        tracing::info!(target: "host", "Host runtime assembly loaded successfully");

        Ok(entry)
    }

    fn open(&mut self, path: &Path) -> BridgeResult<&dyn HostLibrary> {
        let library = (self.opener)(path).map_err(|reason| BridgeError::LibraryLoad {
            path: path.display().to_string(),
            reason,
        })?;
        Ok(&**self.library.insert(library))
    }

    fn initialize_context(
        entry_points: &HostEntryPoints,
        target: &ManagedTarget,
    ) -> BridgeResult<HostContext> {
        let mut handle: HostfxrHandle = ptr::null_mut();

        // SAFETY: 字符串以 NUL 结尾，`handle` 是有效的输出位置。
        let code = unsafe {
            (entry_points.initialize_for_runtime_config)(
                target.runtime_config.as_ptr(),
                ptr::null(),
                &mut handle,
            )
        };

        let context = HostContext {
            handle,
            close: entry_points.close,
        };

        if code != 0 || context.handle.is_null() {
            tracing::debug!(target: "host", "initialize_for_runtime_config returned {:#x}", code);
            return Err(BridgeError::RuntimeInit(format!(
                "runtime config rejected (code {:#x})",
                code
            )));
        }

        Ok(context)
    }

    fn load_assembly_delegate(
        entry_points: &HostEntryPoints,
        context: &HostContext,
    ) -> BridgeResult<LoadAssemblyAndGetFunctionPointerFn> {
        let mut delegate: *mut c_void = ptr::null_mut();

        // SAFETY: 上下文有效，`delegate` 是有效的输出位置。
        let code = unsafe {
            (entry_points.get_runtime_delegate)(
                context.handle,
                DelegateType::LoadAssemblyAndGetFunctionPointer,
                &mut delegate,
            )
        };

        if code != 0 || delegate.is_null() {
            return Err(BridgeError::DelegateResolution);
        }

        // SAFETY: hdt_load_assembly_and_get_function_pointer 委托的签名固定。
        Ok(unsafe {
            std::mem::transmute::<*mut c_void, LoadAssemblyAndGetFunctionPointerFn>(delegate)
        })
    }

    fn resolve_managed_entry(
        &self,
        load_assembly: LoadAssemblyAndGetFunctionPointerFn,
        target: &ManagedTarget,
    ) -> BridgeResult<ManagedEntryPoint> {
        let mut function: *mut c_void = ptr::null_mut();

        // SAFETY: 所有字符串以 NUL 结尾，`function` 是有效的输出位置。
        let code = unsafe {
            load_assembly(
                target.assembly.as_ptr(),
                target.type_name.as_ptr(),
                target.method_name.as_ptr(),
                UNMANAGEDCALLERSONLY_METHOD,
                ptr::null_mut(),
                &mut function,
            )
        };

        let entry = if code == 0 {
            // SAFETY: 入口方法以 UnmanagedCallersOnly 导出，签名即 ManagedCommandFn。
            unsafe { ManagedEntryPoint::from_raw(function) }
        } else {
            None
        };

        entry.ok_or_else(|| BridgeError::ManagedEntryPoint {
            type_name: self.config.runtime_type_name.clone(),
            method: self.config.runtime_method_name.clone(),
            code,
        })
    }

    /// 已解析的路径（初始化走过第一步后可用）
    pub fn paths(&self) -> Option<&HostPaths> {
        self.paths.as_ref()
    }

    pub fn is_library_loaded(&self) -> bool {
        self.library.is_some()
    }

    /// 释放宿主库句柄
    pub fn shutdown(&mut self) {
        if self.library.take().is_some() {
            tracing::info!(target: "host", "Host library released");
        }
    }
}
