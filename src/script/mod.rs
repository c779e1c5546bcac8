//! Line-oriented splash script: `name = value` assignments and `command arg*` invocations.

mod lexer;
pub mod parser;
pub mod value;
pub mod vm;

pub use parser::{Statement, parse_script};
pub use value::{CommandToken, Environment, Value, ValueKind};
pub use vm::{CommandFn, Interpreter};
