//! CLI module: argument parsing and command implementations.

pub mod args;
pub mod commands;
mod session;

pub use args::{Cli, Commands, QueryArgs, Target};
pub use session::{Session, canonical};
