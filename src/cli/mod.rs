//! Terminal front end for a blueprint session.

pub mod parser;
pub mod repl;

pub use parser::{Command, CommandParser};
pub use repl::{Reply, Repl};
