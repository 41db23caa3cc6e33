//! 原生/托管互操作协议
//!
//! - `table` - 能力函数表与校验和
//! - `slots` - 事件槽位与运行时回调槽位
//! - `command` - 命令信封
//! - `dispatch` - 命令分发

pub mod command;
pub mod dispatch;
pub mod slots;
pub mod table;

pub use command::{ArgumentType, Command, CommandType, InitReferences, RawCommand};
pub use dispatch::{Dispatcher, ManagedCommandFn, ManagedEntryPoint, RawResult, INITIALIZE_SUCCESS};
pub use slots::{EventKind, EventSlots, RuntimeFunctions, EVENT_SLOT_CAPACITY};
pub use table::{Checksum, FunctionGroup, FunctionSlot, FunctionTable};
