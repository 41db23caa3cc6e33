//! 宿主加载
//!
//! - `hostfxr` - 宿主库 ABI
//! - `library` - 动态库符号来源
//! - `loader` - 加载流程

pub mod hostfxr;
pub mod library;
pub mod loader;

pub use library::{open_dynamic_library, HostLibrary, LibraryOpener};
pub use loader::{host_error_writer, HostEntryPoints, HostLoader};
