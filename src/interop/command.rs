//! Cross-boundary command envelope
//!
//! `Command` is the Rust-side sum type: one variant per command shape, each
//! carrying exactly its payload. `RawCommand` is its `#[repr(C)]` wire form,
//! a payload union followed by a discriminator, passed by value to the managed
//! entry function.

use std::ffi::c_void;
use std::fmt;
use std::ptr;

use super::table::Checksum;

/// Wire discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CommandType {
    Initialize = 1,
    LoadAssemblies = 2,
    UnloadAssemblies = 3,
    Execute = 4,
}

/// Argument shape of an `Execute` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ArgumentType {
    None = 0,
    Single = 1,
}

/// The three top-level references handed over during initialization.
///
/// Field order is part of the contract: runtime callbacks, event slots,
/// capability function table.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct InitReferences {
    pub runtime_functions: *mut c_void,
    pub events: *mut c_void,
    pub functions: *mut c_void,
}

#[derive(Clone, Copy)]
#[repr(C)]
struct InitializePayload {
    buffer: *const *mut c_void,
    checksum: i32,
}

#[derive(Clone, Copy)]
#[repr(C)]
struct ExecutePayload {
    function: *mut c_void,
    value: f32,
    argument: ArgumentType,
}

#[derive(Clone, Copy)]
#[repr(C)]
union CommandPayload {
    initialize: InitializePayload,
    execute: ExecutePayload,
}

/// Wire form of a command
#[derive(Clone, Copy)]
#[repr(C)]
pub struct RawCommand {
    payload: CommandPayload,
    kind: CommandType,
}

impl RawCommand {
    pub fn kind(&self) -> CommandType {
        self.kind
    }

    /// Target function of an `Execute` command
    pub fn function(&self) -> Option<*mut c_void> {
        match self.kind {
            // SAFETY: `kind` is only ever `Execute` when the execute payload was written.
            CommandType::Execute => Some(unsafe { self.payload.execute.function }),
            _ => None,
        }
    }

    /// Delta time of a timed `Execute` command
    pub fn delta_time(&self) -> Option<f32> {
        match self.kind {
            CommandType::Execute => {
                // SAFETY: see `function`.
                let execute = unsafe { self.payload.execute };
                (execute.argument == ArgumentType::Single).then_some(execute.value)
            }
            _ => None,
        }
    }

    pub fn checksum(&self) -> Option<i32> {
        match self.kind {
            // SAFETY: `Initialize` always carries the initialize payload.
            CommandType::Initialize => Some(unsafe { self.payload.initialize.checksum }),
            _ => None,
        }
    }

    /// Reads the three references of an `Initialize` command
    ///
    /// # Safety
    /// The `InitReferences` the command was built from must still be alive.
    pub unsafe fn references(&self) -> Option<InitReferences> {
        match self.kind {
            CommandType::Initialize => {
                let buffer = self.payload.initialize.buffer as *const InitReferences;
                Some(ptr::read(buffer))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for RawCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawCommand")
            .field("kind", &self.kind)
            .field("function", &self.function())
            .field("delta_time", &self.delta_time())
            .field("checksum", &self.checksum())
            .finish()
    }
}

/// A command sent to the managed entry function
#[derive(Debug, Clone, Copy)]
pub enum Command<'a> {
    /// Handshake carrying the top-level references and the table checksum
    Initialize {
        references: &'a InitReferences,
        checksum: Checksum,
    },
    LoadAssemblies,
    UnloadAssemblies,
    /// Invoke a managed event function without arguments
    Invoke { function: *mut c_void },
    /// Invoke a managed event function with an elapsed-time argument
    InvokeTimed { function: *mut c_void, delta_time: f32 },
}

impl Command<'_> {
    pub fn kind(&self) -> CommandType {
        match self {
            Command::Initialize { .. } => CommandType::Initialize,
            Command::LoadAssemblies => CommandType::LoadAssemblies,
            Command::UnloadAssemblies => CommandType::UnloadAssemblies,
            Command::Invoke { .. } | Command::InvokeTimed { .. } => CommandType::Execute,
        }
    }

    pub fn to_raw(&self) -> RawCommand {
        let payload = match *self {
            Command::Initialize {
                references,
                checksum,
            } => CommandPayload {
                initialize: InitializePayload {
                    buffer: references as *const InitReferences as *const *mut c_void,
                    checksum: checksum.value(),
                },
            },
            Command::LoadAssemblies | Command::UnloadAssemblies => CommandPayload {
                execute: ExecutePayload {
                    function: ptr::null_mut(),
                    value: 0.0,
                    argument: ArgumentType::None,
                },
            },
            Command::Invoke { function } => CommandPayload {
                execute: ExecutePayload {
                    function,
                    value: 0.0,
                    argument: ArgumentType::None,
                },
            },
            Command::InvokeTimed {
                function,
                delta_time,
            } => CommandPayload {
                execute: ExecutePayload {
                    function,
                    value: delta_time,
                    argument: ArgumentType::Single,
                },
            },
        };

        RawCommand {
            payload,
            kind: self.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_only_commands() {
        let raw = Command::LoadAssemblies.to_raw();
        assert_eq!(raw.kind(), CommandType::LoadAssemblies);
        assert_eq!(raw.function(), None);
        assert_eq!(raw.checksum(), None);

        assert_eq!(
            Command::UnloadAssemblies.to_raw().kind(),
            CommandType::UnloadAssemblies
        );
    }

    #[test]
    fn test_invoke_has_no_argument() {
        let raw = Command::Invoke {
            function: 0x40 as *mut c_void,
        }
        .to_raw();
        assert_eq!(raw.kind(), CommandType::Execute);
        assert_eq!(raw.function(), Some(0x40 as *mut c_void));
        assert_eq!(raw.delta_time(), None);
    }

    #[test]
    fn test_timed_invoke_carries_delta() {
        let raw = Command::InvokeTimed {
            function: 0x40 as *mut c_void,
            delta_time: 0.016,
        }
        .to_raw();
        assert_eq!(raw.delta_time(), Some(0.016));
    }

    #[test]
    fn test_initialize_references_round_trip() {
        let references = InitReferences {
            runtime_functions: 0x1 as *mut c_void,
            events: 0x2 as *mut c_void,
            functions: 0x3 as *mut c_void,
        };
        let raw = Command::Initialize {
            references: &references,
            checksum: Checksum::from_group_sizes(&[1, 3, 4, 10]),
        }
        .to_raw();

        assert_eq!(raw.checksum(), Some(22));
        let read = unsafe { raw.references() }.unwrap();
        assert_eq!(read.events, 0x2 as *mut c_void);
        assert_eq!(read.functions, 0x3 as *mut c_void);
    }

    #[test]
    fn test_wire_layout() {
        assert_eq!(std::mem::size_of::<InitReferences>(), 3 * std::mem::size_of::<usize>());
        assert_eq!(
            std::mem::offset_of!(RawCommand, kind),
            std::mem::size_of::<CommandPayload>()
        );
    }
}
