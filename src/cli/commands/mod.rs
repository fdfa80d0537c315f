//! Command implementations for the CLI.

pub mod index;
pub mod init;
pub mod query;
