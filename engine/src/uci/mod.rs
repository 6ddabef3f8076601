//! Engine output lines.

pub mod parser;

pub use parser::{parse_engine_line, EngineMessage, Wdl};
