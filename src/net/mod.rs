//! Wire-level pieces of the local edge emulator.

pub mod parser;
pub mod server;
pub mod validator;
pub mod wire;
