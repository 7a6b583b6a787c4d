//! The coordinator: single owner of the client registry.
//!
//! Every registry operation arrives as a [`Request`] and is applied by
//! [`Coordinator::process`] one at a time. Whoever drives `process` from a
//! single task gets register/unregister/broadcast/count/shutdown
//! linearized for free; no locks are involved.

use bytes::Bytes;
use echo_protocol::double_echo;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::client::{ClientEntry, ClientId};
use crate::registry::{ClientRegistry, FanOut};

/// One operation against the registry.
#[derive(Debug)]
pub enum Request {
    Register { id: ClientId, entry: ClientEntry },
    Unregister { id: ClientId },
    /// A raw inbound line, terminator included if there was one.
    Broadcast { line: Bytes },
    Count { reply: oneshot::Sender<usize> },
    Shutdown,
}

/// Whether the driving loop should keep receiving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Running,
    /// Terminal. The registry is empty and stays empty.
    Closed,
}

#[derive(Debug)]
pub struct Coordinator {
    registry: ClientRegistry,
    lifecycle: Lifecycle,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            registry: ClientRegistry::new(),
            lifecycle: Lifecycle::Running,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Apply a single request.
    pub fn process(&mut self, request: Request) -> Flow {
        match request {
            Request::Register { id, entry } => self.register(id, entry),
            Request::Unregister { id } => self.unregister(id),
            Request::Broadcast { line } => {
                self.broadcast(&line);
            }
            Request::Count { reply } => {
                // The asker may have given up waiting; nothing to do then.
                let _ = reply.send(self.count());
            }
            Request::Shutdown => {
                self.shutdown();
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    pub fn register(&mut self, id: ClientId, entry: ClientEntry) {
        if self.lifecycle == Lifecycle::Closed {
            // Dropping the entry closes the late connection straight away.
            debug!(client_id = %id, "register after shutdown, closing");
            return;
        }

        if self.registry.register(id, entry).is_some() {
            warn!(client_id = %id, "client id registered twice, previous entry closed");
        }
        debug!(client_id = %id, clients = self.registry.len(), "client registered");
    }

    pub fn unregister(&mut self, id: ClientId) {
        if self.registry.unregister(id) {
            debug!(client_id = %id, clients = self.registry.len(), "client unregistered");
        }
    }

    /// Transform `line` and offer it to every registered client.
    pub fn broadcast(&mut self, line: &[u8]) -> FanOut {
        if self.lifecycle == Lifecycle::Closed {
            return FanOut::default();
        }

        let payload = double_echo(line);
        let summary = self.registry.fan_out(&payload);

        debug!(
            bytes = payload.len(),
            delivered = summary.delivered,
            dropped = summary.dropped,
            closed = summary.closed,
            "broadcast"
        );
        summary
    }

    pub fn count(&self) -> usize {
        self.registry.len()
    }

    /// Close every connection and move to [`Lifecycle::Closed`].
    pub fn shutdown(&mut self) {
        if self.lifecycle == Lifecycle::Closed {
            return;
        }

        let closed = self.registry.close_all();
        self.lifecycle = Lifecycle::Closed;
        info!(closed, "coordinator shut down");
    }
}
