//! hostfxr 与托管入口的桩实现
//!
//! 所有状态都是线程局部的，每个测试在自己的线程上运行，互不干扰。
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::ffi::{c_char, c_void};
use std::path::Path;
use std::ptr;

use clr_bridge::config::BridgeConfig;
use clr_bridge::host::hostfxr::{
    self, CharT, DelegateType, ErrorWriterFn, HostfxrHandle, InitializeParameters,
    UNMANAGEDCALLERSONLY_METHOD,
};
use clr_bridge::host::{HostLibrary, HostLoader, LibraryOpener};
use clr_bridge::interop::{CommandType, EventKind, RawCommand, INITIALIZE_SUCCESS};
use clr_bridge::runtime::{Bridge, LogLevel};

/// 假的托管事件函数地址，只作为标识传回托管入口
const EVENT_BASE: usize = 0x1000;

static CONTEXT: u8 = 0;

thread_local! {
    static MISSING: Cell<Option<&'static str>> = const { Cell::new(None) };
    static CALLED: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    static ERROR_WRITER: Cell<Option<ErrorWriterFn>> = const { Cell::new(None) };
    static INIT_CODE: Cell<i32> = const { Cell::new(0) };
    static DELEGATE_CODE: Cell<i32> = const { Cell::new(0) };
    static LOAD_CODE: Cell<i32> = const { Cell::new(0) };
    static CLOSED: Cell<usize> = const { Cell::new(0) };

    static INIT_RESULT: Cell<isize> = const { Cell::new(INITIALIZE_SUCCESS) };
    static COMMANDS: RefCell<Vec<CommandType>> = const { RefCell::new(Vec::new()) };
    static EXECUTED: RefCell<Vec<(EventKind, Option<f32>)>> = const { RefCell::new(Vec::new()) };
    static SUBSCRIBED: RefCell<Vec<EventKind>> = const { RefCell::new(Vec::new()) };
    static FATAL_ON: Cell<Option<EventKind>> = const { Cell::new(None) };
    static CHECKSUM: Cell<Option<i32>> = const { Cell::new(None) };
    static EVENTS: Cell<*mut c_void> = const { Cell::new(ptr::null_mut()) };
    static RUNTIME_FUNCTIONS: Cell<*mut c_void> = const { Cell::new(ptr::null_mut()) };
    static FUNCTIONS: Cell<*mut c_void> = const { Cell::new(ptr::null_mut()) };
}

fn record(step: &'static str) {
    CALLED.with(|called| called.borrow_mut().push(step));
}

unsafe extern "C" fn set_error_writer(writer: Option<ErrorWriterFn>) -> Option<ErrorWriterFn> {
    record(hostfxr::SET_ERROR_WRITER);
    ERROR_WRITER.with(|current| current.replace(writer))
}

unsafe extern "C" fn initialize_for_runtime_config(
    _runtime_config_path: *const CharT,
    _parameters: *const InitializeParameters,
    handle: *mut HostfxrHandle,
) -> i32 {
    record(hostfxr::INITIALIZE_FOR_RUNTIME_CONFIG);
    let code = INIT_CODE.with(Cell::get);
    if code == 0 {
        *handle = ptr::addr_of!(CONTEXT) as HostfxrHandle;
    }
    code
}

unsafe extern "C" fn get_runtime_delegate(
    _handle: HostfxrHandle,
    delegate_type: DelegateType,
    delegate: *mut *mut c_void,
) -> i32 {
    record(hostfxr::GET_RUNTIME_DELEGATE);
    let code = DELEGATE_CODE.with(Cell::get);
    if code == 0 && delegate_type == DelegateType::LoadAssemblyAndGetFunctionPointer {
        *delegate = load_assembly_and_get_function_pointer as *mut c_void;
    }
    code
}

unsafe extern "C" fn close(_handle: HostfxrHandle) -> i32 {
    record(hostfxr::CLOSE);
    CLOSED.with(|closed| closed.set(closed.get() + 1));
    0
}

unsafe extern "C" fn load_assembly_and_get_function_pointer(
    _assembly_path: *const CharT,
    _type_name: *const CharT,
    _method_name: *const CharT,
    delegate_type_name: *const CharT,
    _reserved: *mut c_void,
    delegate: *mut *mut c_void,
) -> i32 {
    record("load_assembly_and_get_function_pointer");
    let code = LOAD_CODE.with(Cell::get);
    if code == 0 && delegate_type_name == UNMANAGEDCALLERSONLY_METHOD {
        *delegate = managed_command as *mut c_void;
    }
    code
}

/// 托管入口桩
unsafe extern "C" fn managed_command(command: RawCommand) -> *mut c_void {
    COMMANDS.with(|commands| commands.borrow_mut().push(command.kind()));

    match command.kind() {
        CommandType::Initialize => {
            if let Some(references) = command.references() {
                EVENTS.with(|events| events.set(references.events));
                RUNTIME_FUNCTIONS.with(|functions| functions.set(references.runtime_functions));
                FUNCTIONS.with(|functions| functions.set(references.functions));
            }
            CHECKSUM.with(|checksum| checksum.set(command.checksum()));
            INIT_RESULT.with(Cell::get) as *mut c_void
        }
        CommandType::LoadAssemblies => {
            let events = EVENTS.with(Cell::get) as *mut *mut c_void;
            SUBSCRIBED.with(|subscribed| {
                for kind in subscribed.borrow().iter() {
                    events.add(kind.index()).write(event_address(*kind));
                }
            });
            ptr::null_mut()
        }
        CommandType::UnloadAssemblies => ptr::null_mut(),
        CommandType::Execute => {
            let function = command.function().unwrap_or(ptr::null_mut()) as usize;
            let kind = EventKind::ALL[function - EVENT_BASE];
            EXECUTED.with(|executed| executed.borrow_mut().push((kind, command.delta_time())));
            if FATAL_ON.with(Cell::get) == Some(kind) {
                report_fatal("managed failure");
            }
            ptr::null_mut()
        }
    }
}

/// 通过运行时函数槽位 1 上报 Fatal 日志
unsafe fn report_fatal(message: &str) {
    let functions = RUNTIME_FUNCTIONS.with(Cell::get) as *const *mut c_void;
    let log = std::mem::transmute::<*mut c_void, unsafe extern "C" fn(i32, *const c_char)>(
        functions.add(1).read(),
    );
    let message = std::ffi::CString::new(message).unwrap();
    log(LogLevel::Fatal as i32, message.as_ptr());
}

pub fn event_address(kind: EventKind) -> *mut c_void {
    (EVENT_BASE + kind.index()) as *mut c_void
}

/// 只认识四个 hostfxr 导出的桩库
pub struct StubLibrary;

impl HostLibrary for StubLibrary {
    fn symbol(&self, name: &str) -> Option<*mut c_void> {
        if MISSING.with(Cell::get) == Some(name) {
            return None;
        }
        let address = match name {
            hostfxr::SET_ERROR_WRITER => set_error_writer as *mut c_void,
            hostfxr::INITIALIZE_FOR_RUNTIME_CONFIG => initialize_for_runtime_config as *mut c_void,
            hostfxr::GET_RUNTIME_DELEGATE => get_runtime_delegate as *mut c_void,
            hostfxr::CLOSE => close as *mut c_void,
            _ => return None,
        };
        Some(address)
    }
}

pub fn stub_opener() -> LibraryOpener {
    Box::new(|_path: &Path| Ok(Box::new(StubLibrary) as Box<dyn HostLibrary>))
}

pub fn failing_opener() -> LibraryOpener {
    Box::new(|_path: &Path| Err("wrong architecture".to_string()))
}

pub fn config_for(root: &Path) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.host.project_root = Some(root.to_path_buf());
    config
}

pub fn stub_loader(root: &Path) -> HostLoader {
    HostLoader::with_opener(config_for(root).host, stub_opener())
}

pub fn stub_bridge(root: &Path) -> Bridge {
    let config = config_for(root);
    let loader = HostLoader::with_opener(config.host.clone(), stub_opener());
    Bridge::with_loader(config, loader)
}

pub fn reset() {
    MISSING.with(|missing| missing.set(None));
    CALLED.with(|called| called.borrow_mut().clear());
    ERROR_WRITER.with(|writer| writer.set(None));
    INIT_CODE.with(|code| code.set(0));
    DELEGATE_CODE.with(|code| code.set(0));
    LOAD_CODE.with(|code| code.set(0));
    CLOSED.with(|closed| closed.set(0));
    INIT_RESULT.with(|result| result.set(INITIALIZE_SUCCESS));
    COMMANDS.with(|commands| commands.borrow_mut().clear());
    EXECUTED.with(|executed| executed.borrow_mut().clear());
    SUBSCRIBED.with(|subscribed| subscribed.borrow_mut().clear());
    FATAL_ON.with(|fatal| fatal.set(None));
    CHECKSUM.with(|checksum| checksum.set(None));
}

pub fn set_missing(symbol: &'static str) {
    MISSING.with(|missing| missing.set(Some(symbol)));
}

pub fn set_init_code(code: i32) {
    INIT_CODE.with(|value| value.set(code));
}

pub fn set_delegate_code(code: i32) {
    DELEGATE_CODE.with(|value| value.set(code));
}

pub fn set_load_code(code: i32) {
    LOAD_CODE.with(|value| value.set(code));
}

pub fn set_init_result(result: isize) {
    INIT_RESULT.with(|value| value.set(result));
}

/// 托管侧在 LoadAssemblies 时写入这些事件槽位
pub fn subscribe(kinds: &[EventKind]) {
    SUBSCRIBED.with(|subscribed| subscribed.borrow_mut().extend_from_slice(kinds));
}

pub fn fatal_on(kind: EventKind) {
    FATAL_ON.with(|fatal| fatal.set(Some(kind)));
}

pub fn called() -> Vec<&'static str> {
    CALLED.with(|called| called.borrow().clone())
}

pub fn closed() -> usize {
    CLOSED.with(Cell::get)
}

pub fn error_writer_installed() -> bool {
    ERROR_WRITER.with(Cell::get).is_some()
}

/// 宿主加载时安装的错误输出回调
pub fn installed_error_writer() -> Option<ErrorWriterFn> {
    ERROR_WRITER.with(Cell::get)
}

pub fn commands() -> Vec<CommandType> {
    COMMANDS.with(|commands| commands.borrow().clone())
}

pub fn executed() -> Vec<(EventKind, Option<f32>)> {
    EXECUTED.with(|executed| executed.borrow().clone())
}

pub fn managed_checksum() -> Option<i32> {
    CHECKSUM.with(Cell::get)
}

pub fn managed_functions() -> *mut c_void {
    FUNCTIONS.with(Cell::get)
}
