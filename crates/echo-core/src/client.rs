//! Per-client registry entries.
//!
//! A connection is represented on two sides:
//! - [`ClientEntry`], owned by the coordinator's registry: the sending end
//!   of the bounded outbound queue plus a close signal.
//! - [`ClientQueue`], owned by the connection's reader/writer pair: the
//!   receiving ends of both.
//!
//! Dropping the entry is how a connection gets closed. The outbound queue
//! closes (the writer drains what is left and stops) and the close signal
//! fires (the reader stops reading).

use std::fmt;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

/// Identifier for a connected client.
///
/// This is intentionally opaque; we just guarantee uniqueness
/// over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bounded outbound queue of transformed payloads for one client.
pub type OutboundTx = mpsc::Sender<Bytes>;
pub type OutboundRx = mpsc::Receiver<Bytes>;

/// Registry side of one connection.
#[derive(Debug)]
pub struct ClientEntry {
    outbound: OutboundTx,
    // Never sent on; dropping it is the close signal.
    _close: oneshot::Sender<()>,
}

/// Connection side of one registry entry.
#[derive(Debug)]
pub struct ClientQueue {
    /// Drained by the writer loop.
    pub outbound: OutboundRx,
    /// Resolves once the registry entry is dropped.
    pub closed: oneshot::Receiver<()>,
}

/// Outcome of handing one payload to one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Queue at capacity; the payload was discarded for this client.
    Dropped,
    /// The writer is gone.
    Closed,
}

/// Create a linked entry/queue pair with the given outbound capacity.
///
/// # Panics
///
/// Panics if `capacity` is zero, as `tokio::sync::mpsc::channel` does.
pub fn client_channel(capacity: usize) -> (ClientEntry, ClientQueue) {
    let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
    let (close_tx, close_rx) = oneshot::channel();

    let entry = ClientEntry {
        outbound: outbound_tx,
        _close: close_tx,
    };
    let queue = ClientQueue {
        outbound: outbound_rx,
        closed: close_rx,
    };
    (entry, queue)
}

impl ClientEntry {
    /// Enqueue without waiting. A full queue drops the payload.
    pub fn deliver(&self, payload: Bytes) -> Delivery {
        match self.outbound.try_send(payload) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}
