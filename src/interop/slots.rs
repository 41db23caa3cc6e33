//! 事件槽位与运行时回调槽位
//!
//! 事件槽位由托管侧在加载程序集时写入，世界清理时清零。
//! 空槽位表示该事件没有托管订阅者，调用方必须在构造命令前检查。

use std::cell::Cell;
use std::ffi::c_void;
use std::ptr;

/// 事件槽位数组容量（与托管侧约定的数组长度一致）
pub const EVENT_SLOT_CAPACITY: usize = 128;

/// 生命周期与 tick 事件种类，取值即槽位下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum EventKind {
    OnWorldBegin = 0,
    OnWorldPostBegin = 1,
    OnWorldPrePhysicsTick = 2,
    OnWorldDuringPhysicsTick = 3,
    OnWorldPostPhysicsTick = 4,
    OnWorldPostUpdateTick = 5,
    OnWorldEnd = 6,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::OnWorldBegin,
        EventKind::OnWorldPostBegin,
        EventKind::OnWorldPrePhysicsTick,
        EventKind::OnWorldDuringPhysicsTick,
        EventKind::OnWorldPostPhysicsTick,
        EventKind::OnWorldPostUpdateTick,
        EventKind::OnWorldEnd,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// 是否携带 delta time
    pub fn is_timed(self) -> bool {
        matches!(
            self,
            EventKind::OnWorldPrePhysicsTick
                | EventKind::OnWorldDuringPhysicsTick
                | EventKind::OnWorldPostPhysicsTick
                | EventKind::OnWorldPostUpdateTick
        )
    }
}

/// 托管事件函数指针数组
///
/// 数组本身固定在堆上，地址在初始化命令中交给托管侧。托管侧写入时
/// 原生侧只持有共享引用，因此每个槽位都是 `Cell`。
pub struct EventSlots {
    slots: Box<[Cell<*mut c_void>; EVENT_SLOT_CAPACITY]>,
}

impl EventSlots {
    pub fn new() -> Self {
        Self {
            slots: Box::new([const { Cell::new(ptr::null_mut()) }; EVENT_SLOT_CAPACITY]),
        }
    }

    /// 读取槽位，空槽位返回 `None`
    pub fn get(&self, kind: EventKind) -> Option<*mut c_void> {
        let function = self.slots[kind.index()].get();
        (!function.is_null()).then_some(function)
    }

    pub fn set(&self, kind: EventKind, function: *mut c_void) {
        self.slots[kind.index()].set(function);
    }

    /// 全部槽位清零
    pub fn clear(&self) {
        for slot in self.slots.iter() {
            slot.set(ptr::null_mut());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.get().is_null())
    }

    /// 数组地址，交给托管侧写入
    pub fn as_ptr(&self) -> *mut c_void {
        self.slots.as_ptr() as *mut c_void
    }
}

impl Default for EventSlots {
    fn default() -> Self {
        Self::new()
    }
}

/// 托管侧回调原生代码的运行时函数
///
/// 启动时写入一次，此后不可变。
pub struct RuntimeFunctions {
    functions: Box<[*mut c_void; 2]>,
}

impl RuntimeFunctions {
    pub const EXCEPTION: usize = 0;
    pub const LOG: usize = 1;

    pub fn new(exception: *mut c_void, log: *mut c_void) -> Self {
        Self {
            functions: Box::new([exception, log]),
        }
    }

    pub fn get(&self, index: usize) -> Option<*mut c_void> {
        self.functions.get(index).copied()
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.functions.as_ptr() as *mut c_void
    }
}
