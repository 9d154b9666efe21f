#![forbid(unsafe_code)]

//! Runtime: messages, commands, and command scheduling.

pub mod cmd;
pub mod message;

pub use cmd::Cmd;
pub use message::{Leaves, Msg};
