//! echo-core
//!
//! Pure coordination logic for the multi-echo server:
//! - client handles, outbound queues and close signals
//! - the client registry and its drop-on-full fan-out
//! - the coordinator state machine that serializes every registry operation

pub mod client;
pub mod registry;
pub mod coordinator;

pub use client::{client_channel, ClientEntry, ClientId, ClientQueue, Delivery, OutboundRx, OutboundTx};
pub use registry::{ClientRegistry, FanOut};
pub use coordinator::{Coordinator, Flow, Lifecycle, Request};

/// Outbound queue capacity used when nothing else is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 75;
