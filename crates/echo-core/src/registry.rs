//! The client registry: connection handle -> outbound queue.
//!
//! The registry is plain data. It is only ever touched from the
//! coordinator, which is what makes every operation on it linearizable.

use std::collections::HashMap;

use bytes::Bytes;

use crate::client::{ClientEntry, ClientId, Delivery};

/// Result of fanning one payload out to every registered client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    pub dropped: usize,
    pub closed: usize,
}

impl FanOut {
    pub fn recipients(&self) -> usize {
        self.delivered + self.dropped + self.closed
    }
}

/// Registry of connected clients and their outbound queues.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, ClientEntry>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry.
    ///
    /// Returns the displaced entry if `id` was already registered; callers
    /// hand out unique ids, so that only happens on a logic error.
    pub fn register(&mut self, id: ClientId, entry: ClientEntry) -> Option<ClientEntry> {
        self.clients.insert(id, entry)
    }

    /// Remove an entry. Returns `false` if `id` was not registered.
    ///
    /// The removed entry is dropped here, which closes that connection.
    pub fn unregister(&mut self, id: ClientId) -> bool {
        self.clients.remove(&id).is_some()
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Offer `payload` to every registered client without blocking.
    pub fn fan_out(&self, payload: &Bytes) -> FanOut {
        let mut summary = FanOut::default();

        for entry in self.clients.values() {
            match entry.deliver(payload.clone()) {
                Delivery::Queued => summary.delivered += 1,
                Delivery::Dropped => summary.dropped += 1,
                Delivery::Closed => summary.closed += 1,
            }
        }

        summary
    }

    /// Drop every entry, closing all connections. Returns how many there were.
    pub fn close_all(&mut self) -> usize {
        let closed = self.clients.len();
        self.clients.clear();
        closed
    }
}
