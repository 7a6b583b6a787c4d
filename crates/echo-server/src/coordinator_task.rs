//! Central coordinator loop.
//!
//! This task owns the `Coordinator` (and through it the client registry)
//! and applies every `Request` coming from the acceptor, the connection
//! tasks and the facade, strictly one at a time.

use bytes::Bytes;
use echo_core::{ClientEntry, Coordinator, Flow, Request};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

use crate::types::{ClientId, CoordinatorRx, CoordinatorTx};

/// Cloneable front door to the coordinator task.
///
/// Every method is fire-and-forget except [`CoordinatorHandle::count`],
/// which waits for the coordinator's answer. Once the coordinator has
/// stopped, sends fail silently and `count` answers 0.
#[derive(Debug, Clone)]
pub(crate) struct CoordinatorHandle {
    tx: CoordinatorTx,
}

impl CoordinatorHandle {
    /// Returns `false` if the coordinator is gone; the entry is dropped.
    pub fn register(&self, id: ClientId, entry: ClientEntry) -> bool {
        self.tx.send(Request::Register { id, entry }).is_ok()
    }

    pub fn unregister(&self, id: ClientId) {
        let _ = self.tx.send(Request::Unregister { id });
    }

    /// Returns `false` if the coordinator is gone.
    pub fn broadcast(&self, line: Bytes) -> bool {
        self.tx.send(Request::Broadcast { line }).is_ok()
    }

    pub async fn count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Request::Count { reply }).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Request::Shutdown);
    }
}

/// Spawn the coordinator task.
pub(crate) fn spawn_coordinator() -> (CoordinatorHandle, JoinHandle<()>) {
    let (tx, rx): (CoordinatorTx, CoordinatorRx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_coordinator_loop(rx));
    (CoordinatorHandle { tx }, task)
}

/// Run the central coordinator processing loop.
///
/// Ends on `Shutdown`, or when every handle has been dropped. Either way
/// the registry is dropped on exit, which closes any remaining connection.
async fn run_coordinator_loop(mut rx: CoordinatorRx) {
    let mut coordinator = Coordinator::new();

    while let Some(request) = rx.recv().await {
        if coordinator.process(request) == Flow::Stop {
            break;
        }
    }

    info!("coordinator loop shutting down");
}
