//! HTTP API module.
//!
//! This module provides the HTTP server, request types and the log stream
//! for the dashboard backend.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server};
pub use types::*;
