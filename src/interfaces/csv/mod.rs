//! CSV adapters used by the command-line shell.

pub mod balance_writer;
pub mod catalog_reader;
pub mod command_reader;
