//! Terminal presentation for the chat client.

pub mod commands;
pub mod render;

pub use commands::{parse, Command, HELP};
