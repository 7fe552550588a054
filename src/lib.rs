//! Edge adapter for a storefront: builds typed requests and responses from
//! the per-request edge environment, and rewrites rendered HTML into valid
//! AMP markup.
//!
//! The binary in `main.rs` runs a local emulator of the edge runtime on top
//! of this library (see [`net::server`]).

pub mod amp;
pub mod config;
pub mod edge;
pub mod error;
pub mod handler;
pub mod http;
pub mod logging;
pub mod net;

pub use error::{Error, Result};
