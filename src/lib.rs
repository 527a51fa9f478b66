// Machine
mod isa;
pub use isa::{sign_extend, Instruction, Opcode, TrapVector};
mod memory;
pub use memory::{Memory, KBDR, KBSR, KBSR_READY, MEMORY_SIZE};
mod loader;
pub use loader::{load, load_bytes, LoadError};
mod runtime;
pub use runtime::{Condition, Fault, Machine, PC_START};

// Host
mod console;
pub use console::{Console, Input, ScriptedConsole, EOF_SENTINEL};
mod term;
pub use term::{Piped, RawMode, Terminal};

pub mod error;
pub mod output;

pub mod env;
