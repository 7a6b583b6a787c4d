//! Shared types for the echo TCP server.
//!
//! This module defines the channel aliases between connection tasks and
//! the coordinator task.

use echo_core::Request;
use tokio::sync::mpsc;

pub use echo_core::{ClientId, ClientQueue, OutboundRx, OutboundTx};

/// Channel from connection tasks and the facade → coordinator task.
pub type CoordinatorTx = mpsc::UnboundedSender<Request>;
pub type CoordinatorRx = mpsc::UnboundedReceiver<Request>;
