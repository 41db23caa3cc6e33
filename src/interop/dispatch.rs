//! 命令分发
//!
//! 所有跨边界调用都经由唯一的托管入口函数。调用是同步的：
//! 托管侧在某次调用中挂起会让当前帧无限期挂起，这里没有超时或取消机制。

use std::cell::Cell;
use std::ffi::c_void;

use super::command::{Command, InitReferences, RawCommand};
use super::table::Checksum;
use crate::core::{BridgeError, BridgeResult};

/// 托管入口函数签名
pub type ManagedCommandFn = unsafe extern "C" fn(RawCommand) -> *mut c_void;

/// 托管侧成功完成初始化时返回的哨兵值
pub const INITIALIZE_SUCCESS: isize = 0xF;

/// 指针宽度的原始返回值
pub type RawResult = isize;

/// 已解析的托管入口
#[derive(Clone, Copy)]
pub struct ManagedEntryPoint(ManagedCommandFn);

impl ManagedEntryPoint {
    pub fn new(function: ManagedCommandFn) -> Self {
        Self(function)
    }

    /// 由宿主返回的原始地址构造
    ///
    /// # Safety
    /// 非空地址必须指向签名为 [`ManagedCommandFn`] 的函数。
    pub unsafe fn from_raw(address: *mut c_void) -> Option<Self> {
        if address.is_null() {
            None
        } else {
            Some(Self(std::mem::transmute::<*mut c_void, ManagedCommandFn>(
                address,
            )))
        }
    }

    pub fn address(&self) -> *mut c_void {
        self.0 as *mut c_void
    }
}

impl std::fmt::Debug for ManagedEntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ManagedEntryPoint({:p})", self.address())
    }
}

/// 命令分发器
///
/// 只在主更新线程上使用。除初始化命令外，不解释返回值。
#[derive(Debug)]
pub struct Dispatcher {
    entry: ManagedEntryPoint,
    dispatched: Cell<u64>,
}

impl Dispatcher {
    pub fn new(entry: ManagedEntryPoint) -> Self {
        Self {
            entry,
            dispatched: Cell::new(0),
        }
    }

    /// 发送一条命令
    pub fn dispatch(&self, command: &Command<'_>) -> RawResult {
        let raw = command.to_raw();
        tracing::trace!(target: "interop", "Dispatching {:?}", raw);
        self.dispatched.set(self.dispatched.get() + 1);

        // SAFETY: 入口在宿主加载阶段解析，签名由托管侧的导出约定保证；
        // `command` 借用的数据在调用期间保持有效。
        unsafe { (self.entry.0)(raw) as RawResult }
    }

    /// 发送初始化命令并校验哨兵
    pub fn initialize(&self, references: &InitReferences, checksum: Checksum) -> BridgeResult<()> {
        let result = self.dispatch(&Command::Initialize {
            references,
            checksum,
        });

        if result == INITIALIZE_SUCCESS {
            tracing::info!(target: "interop", "Host runtime assembly initialized successfully");
            Ok(())
        } else {
            Err(BridgeError::ManagedInitMismatch {
                expected: INITIALIZE_SUCCESS,
                actual: result,
            })
        }
    }

    /// 已分发的命令数
    pub fn dispatched(&self) -> u64 {
        self.dispatched.get()
    }

    pub fn entry(&self) -> ManagedEntryPoint {
        self.entry
    }
}
