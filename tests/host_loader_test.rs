mod common;

use std::io;
use std::sync::{Arc, Mutex};

use clr_bridge::host::hostfxr::{self, HostString};
use clr_bridge::interop::{CommandType, FunctionTable};
use clr_bridge::runtime::{StatusType, TickState};
use clr_bridge::BridgeError;
use common::*;

const SYMBOLS: [&str; 4] = [
    hostfxr::SET_ERROR_WRITER,
    hostfxr::INITIALIZE_FOR_RUNTIME_CONFIG,
    hostfxr::GET_RUNTIME_DELEGATE,
    hostfxr::CLOSE,
];

#[test]
fn test_missing_entry_point_is_named_and_stops_loading() {
    let dir = tempfile::tempdir().unwrap();

    for symbol in SYMBOLS {
        reset();
        set_missing(symbol);
        let mut loader = stub_loader(dir.path());

        match loader.initialize() {
            Err(BridgeError::EntryPointMissing(name)) => assert_eq!(name, symbol),
            other => panic!("expected EntryPointMissing({}), got {:?}", symbol, other),
        }
        assert!(called().is_empty(), "no host function may run after a missing {}", symbol);
        // 失败后库句柄保留到关闭时释放
        assert!(loader.is_library_loaded());
        loader.shutdown();
        assert!(!loader.is_library_loaded());
    }
}

#[test]
fn test_successful_load_runs_every_step_in_order() {
    reset();
    let dir = tempfile::tempdir().unwrap();
    let mut loader = stub_loader(dir.path());

    let entry = loader.initialize().unwrap();

    assert!(!entry.address().is_null());
    assert!(error_writer_installed());
    assert_eq!(
        called(),
        vec![
            hostfxr::SET_ERROR_WRITER,
            hostfxr::INITIALIZE_FOR_RUNTIME_CONFIG,
            hostfxr::GET_RUNTIME_DELEGATE,
            hostfxr::CLOSE,
            "load_assembly_and_get_function_pointer",
        ]
    );
    let paths = loader.paths().unwrap();
    assert!(paths.hostfxr.starts_with(dir.path()));
}

#[test]
fn test_runtime_init_failure_does_not_close_null_context() {
    reset();
    set_init_code(-1);
    let dir = tempfile::tempdir().unwrap();
    let mut loader = stub_loader(dir.path());

    assert!(matches!(loader.initialize(), Err(BridgeError::RuntimeInit(_))));
    assert_eq!(closed(), 0);
}

#[test]
fn test_delegate_failure_still_closes_context() {
    reset();
    set_delegate_code(-1);
    let dir = tempfile::tempdir().unwrap();
    let mut loader = stub_loader(dir.path());

    assert!(matches!(loader.initialize(), Err(BridgeError::DelegateResolution)));
    assert_eq!(closed(), 1);
}

#[test]
fn test_managed_entry_point_failure() {
    reset();
    set_load_code(-1);
    let dir = tempfile::tempdir().unwrap();
    let mut loader = stub_loader(dir.path());

    let err = loader.initialize().unwrap_err();
    assert!(matches!(err, BridgeError::ManagedEntryPoint { code: -1, .. }));
    assert!(err.is_host_failure());
}

#[test]
fn test_library_load_failure_keeps_bridge_stopped() {
    reset();
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let loader = clr_bridge::host::HostLoader::with_opener(config.host.clone(), failing_opener());
    let mut bridge = clr_bridge::Bridge::with_loader(config, loader);

    let err = bridge.startup().unwrap_err();
    assert!(matches!(err, BridgeError::LibraryLoad { .. }));
    assert_eq!(bridge.status(), StatusType::Stopped);

    // Stopped 是终态
    assert!(matches!(bridge.startup(), Err(BridgeError::NotInitialized)));
    bridge.shutdown();
    assert_eq!(bridge.tick_state(), TickState::Stopped);
}

#[test]
fn test_status_stays_stopped_until_managed_init_succeeds() {
    reset();
    set_init_result(0);
    let dir = tempfile::tempdir().unwrap();
    let mut bridge = stub_bridge(dir.path());

    let err = bridge.startup().unwrap_err();

    assert!(matches!(
        err,
        BridgeError::ManagedInitMismatch {
            expected: 0xF,
            actual: 0
        }
    ));
    assert_eq!(bridge.status(), StatusType::Stopped);
    assert_eq!(commands(), vec![CommandType::Initialize]);
    // 握手失败后不暴露半初始化的函数表
    assert!(bridge.table().is_none());
    assert!(bridge.checksum().is_none());
    assert_eq!(bridge.dispatched_count(), 0);
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_host_diagnostics_reach_the_host_log_target() {
    reset();
    let dir = tempfile::tempdir().unwrap();
    let mut loader = stub_loader(dir.path());
    loader.initialize().unwrap();
    let writer = installed_error_writer().expect("error writer installed");

    let buffer = LogBuffer::default();
    let sink = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || sink.clone())
        .with_ansi(false)
        .with_target(true)
        .finish();

    let message = HostString::new("The specified framework was not found").unwrap();
    tracing::subscriber::with_default(subscriber, || unsafe {
        writer(message.as_ptr());
    });

    let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    let line = output
        .lines()
        .find(|line| line.contains("The specified framework was not found"))
        .expect("host diagnostic logged");
    assert!(line.contains("ERROR"));
    assert!(line.contains("host:"));
}

#[test]
fn test_startup_sends_checksum_and_table() {
    reset();
    let dir = tempfile::tempdir().unwrap();
    let mut bridge = stub_bridge(dir.path());

    bridge.startup().unwrap();

    assert_eq!(bridge.status(), StatusType::Idle);
    assert_eq!(managed_checksum(), Some(22));
    assert_eq!(bridge.checksum().map(|c| c.value()), Some(22));

    let table: &FunctionTable = bridge.table().unwrap();
    assert_eq!(table.as_ptr(), managed_functions());
    // 托管侧看到的第一组第一个槽位就是 Assert.OutputMessage
    let first = unsafe {
        let groups = managed_functions() as *const *const *mut std::ffi::c_void;
        groups.read().read()
    };
    assert_eq!(Some(first), table.address(0, 0));

    assert!(dir.path().join("Managed").is_dir());
    bridge.shutdown();
    assert!(!bridge.loader().is_library_loaded());
}
