//! Per-connection I/O: one reader loop and one writer loop per client.

use std::io;

use echo_protocol::LineFramer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::coordinator_task::CoordinatorHandle;
use crate::types::{ClientId, ClientQueue, OutboundRx};

const READ_CHUNK: usize = 1024;

/// Run the client I/O loops for a single, already registered connection.
///
/// The writer runs as its own task; the reader runs here. When the peer
/// goes away the client is unregistered, which closes the outbound queue
/// and lets the writer drain and finish, unless the server stops first.
/// When the server closes the connection instead, the writer is cut off
/// wherever it is.
pub(crate) async fn run_client(
    client_id: ClientId,
    stream: TcpStream,
    queue: ClientQueue,
    coordinator: CoordinatorHandle,
    max_line_len: usize,
    shutdown: watch::Receiver<bool>,
) {
    let peer = stream.peer_addr().ok();
    let (read_half, write_half) = stream.into_split();
    let ClientQueue { outbound, closed } = queue;

    let writer = tokio::spawn(run_writer(client_id, write_half, outbound));

    match run_reader(client_id, read_half, closed, &coordinator, max_line_len).await {
        ReaderExit::PeerGone | ReaderExit::LineTooLong => {
            coordinator.unregister(client_id);
            finish_writer(client_id, writer, shutdown).await;
        }
        ReaderExit::ClosedByServer => {
            // A writer blocked on a peer that never reads would otherwise hold
            // the socket open forever.
            writer.abort();
            report_writer(client_id, writer.await);
        }
    }

    debug!(%client_id, ?peer, "client disconnected");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderExit {
    /// End-of-stream or read error.
    PeerGone,
    /// More than `max_line_len` bytes arrived without a terminator.
    LineTooLong,
    /// The registry entry was dropped: unregister or shutdown.
    ClosedByServer,
}

/// Let the writer drain what is still queued, cutting it off if the server
/// stops in the meantime.
async fn finish_writer(
    client_id: ClientId,
    mut writer: JoinHandle<()>,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::select! {
        result = &mut writer => report_writer(client_id, result),
        // A dropped sender means the server itself is gone.
        _ = shutdown.changed() => {
            debug!(%client_id, "server stopping, abandoning drain");
            writer.abort();
            report_writer(client_id, writer.await);
        }
    }
}

fn report_writer(client_id: ClientId, result: Result<(), tokio::task::JoinError>) {
    match result {
        Err(e) if !e.is_cancelled() => warn!(%client_id, error = %e, "writer task failed"),
        _ => {}
    }
}

/// Read lines and submit each one for broadcast.
///
/// On end-of-stream or a read error, a trailing line without a terminator
/// is still submitted once before returning.
async fn run_reader(
    client_id: ClientId,
    mut read_half: OwnedReadHalf,
    mut closed: oneshot::Receiver<()>,
    coordinator: &CoordinatorHandle,
    max_line_len: usize,
) -> ReaderExit {
    let mut framer = LineFramer::with_max_line_len(max_line_len);
    let mut temp_buf = [0u8; READ_CHUNK];

    loop {
        tokio::select! {
            _ = &mut closed => {
                debug!(%client_id, "connection closed by server");
                return ReaderExit::ClosedByServer;
            }
            result = read_half.read(&mut temp_buf) => match result {
                Ok(0) => {
                    debug!(%client_id, "end of stream");
                    break;
                }
                Ok(n) => {
                    framer.push(&temp_buf[..n]);
                    while let Some(line) = framer.next_line() {
                        if !coordinator.broadcast(line) {
                            return ReaderExit::ClosedByServer;
                        }
                    }
                    if framer.overflowed() {
                        warn!(%client_id, pending = framer.pending(), "line too long, disconnecting");
                        return ReaderExit::LineTooLong;
                    }
                }
                Err(e) => {
                    debug!(%client_id, error = %e, "read error");
                    break;
                }
            }
        }
    }

    if let Some(tail) = framer.finish() {
        coordinator.broadcast(tail);
    }
    ReaderExit::PeerGone
}

/// Drain the outbound queue onto the socket, in order.
async fn run_writer(client_id: ClientId, mut write_half: OwnedWriteHalf, mut outbound: OutboundRx) {
    while let Some(payload) = outbound.recv().await {
        if let Err(e) = write_payload(&mut write_half, &payload).await {
            debug!(%client_id, error = %e, "write error");
            return;
        }
    }

    // Queue closed: the client was unregistered or the server is stopping.
    if let Err(e) = write_half.shutdown().await {
        debug!(%client_id, error = %e, "failed to close connection");
    }
}

async fn write_payload(stream: &mut OwnedWriteHalf, payload: &[u8]) -> io::Result<()> {
    stream.write_all(payload).await?;
    stream.flush().await
}
