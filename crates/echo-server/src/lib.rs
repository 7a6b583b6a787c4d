//! echo-server
//!
//! Multi-client async TCP server: every line received from any client is
//! double-echoed to all connected clients.

pub mod config;
pub mod error;
pub mod server;
pub mod types;

// these are internal modules, not re-exported
mod client;
mod coordinator_task;

pub use config::{CliArgs, Config};
pub use error::{ConfigError, ServerError};
pub use server::EchoServer;
