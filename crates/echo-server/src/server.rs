//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Binds the configured address/port.
//! - Spawns a single coordinator task that owns the client registry.
//! - Accepts new TCP connections, assigns each one a `ClientId`,
//!   registers it and spawns its I/O task.
//!
//! The per-client logic and coordinator loop live in the `client` and
//! `coordinator_task` modules respectively. [`EchoServer`] is the public
//! face: start, stop, count.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use echo_core::client_channel;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client;
use crate::config::Config;
use crate::coordinator_task::{spawn_coordinator, CoordinatorHandle};
use crate::error::ServerError;
use crate::types::ClientId;

/// Global-ish counter for assigning unique `ClientId`s.
static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_client_id() -> ClientId {
    let id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
    ClientId(id)
}

/// Multi-client double-echo server.
///
/// Lifecycle is one-way: not started → running → closed.
#[derive(Debug)]
pub struct EchoServer {
    config: Config,
    state: ServerState,
}

#[derive(Debug)]
enum ServerState {
    NotStarted,
    Running(Running),
    Closed,
}

#[derive(Debug)]
struct Running {
    local_addr: SocketAddr,
    coordinator: CoordinatorHandle,
    shutdown_tx: watch::Sender<bool>,
    acceptor: JoinHandle<()>,
    coordinator_task: JoinHandle<()>,
}

/// What the acceptor needs from the configuration.
#[derive(Debug, Clone, Copy)]
struct AcceptLimits {
    queue_capacity: usize,
    max_clients: Option<usize>,
    max_line_len: usize,
}

impl EchoServer {
    /// Create a server that is not listening yet.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: ServerState::NotStarted,
        }
    }

    /// Default configuration on `port`, started.
    pub async fn start_on(port: u16) -> Result<Self, ServerError> {
        let mut server = EchoServer::new(Config {
            port,
            ..Config::default()
        });
        server.start().await?;
        Ok(server)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bind the listening socket and launch the coordinator and acceptor.
    ///
    /// Returns as soon as both tasks are spawned, with the bound address.
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        match self.state {
            ServerState::NotStarted => {}
            ServerState::Running(_) => return Err(ServerError::AlreadyStarted),
            ServerState::Closed => return Err(ServerError::Closed),
        }
        self.config.validate()?;

        let addr = self.config.socket_addr_string();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

        let (coordinator, coordinator_task) = spawn_coordinator();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let limits = AcceptLimits {
            queue_capacity: self.config.queue_capacity,
            max_clients: self.config.client_limit(),
            max_line_len: self.config.max_line_len,
        };

        let acceptor = tokio::spawn(run_acceptor(
            listener,
            coordinator.clone(),
            limits,
            shutdown_rx,
        ));

        info!(%local_addr, "echo server listening");
        self.state = ServerState::Running(Running {
            local_addr,
            coordinator,
            shutdown_tx,
            acceptor,
            coordinator_task,
        });
        Ok(local_addr)
    }

    /// Close every connection and the listening socket.
    ///
    /// Safe to call more than once; only the first call does anything.
    pub async fn stop(&mut self) {
        let running = match std::mem::replace(&mut self.state, ServerState::Closed) {
            ServerState::Running(running) => running,
            _ => return,
        };

        let _ = running.shutdown_tx.send(true);
        running.coordinator.shutdown();

        if let Err(e) = running.acceptor.await {
            warn!(error = %e, "acceptor task failed");
        }
        if let Err(e) = running.coordinator_task.await {
            warn!(error = %e, "coordinator task failed");
        }
        info!("echo server stopped");
    }

    /// Number of currently registered clients; 0 unless running.
    pub async fn count(&self) -> usize {
        match &self.state {
            ServerState::Running(running) => running.coordinator.count().await,
            _ => 0,
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.state {
            ServerState::Running(running) => Some(running.local_addr),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ServerState::Running(_))
    }

    /// Start if needed, serve until `shutdown` resolves, then stop.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        if !self.is_running() {
            self.start().await?;
        }
        shutdown.await;
        self.stop().await;
        Ok(())
    }
}

/// Accept loop. Exits when the shutdown flag flips (or its sender is gone),
/// dropping the listener.
async fn run_acceptor(
    listener: TcpListener,
    coordinator: CoordinatorHandle,
    limits: AcceptLimits,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    accept_client(stream, peer, &coordinator, limits, &shutdown).await
                }
                Err(e) => warn!(error = %e, "failed to accept connection"),
            }
        }
    }

    debug!("acceptor stopped");
}

async fn accept_client(
    stream: TcpStream,
    peer: SocketAddr,
    coordinator: &CoordinatorHandle,
    limits: AcceptLimits,
    shutdown: &watch::Receiver<bool>,
) {
    if let Some(max_clients) = limits.max_clients {
        let current_clients = coordinator.count().await;
        if current_clients >= max_clients {
            warn!(%peer, max_clients, "rejecting connection: max_clients reached");
            // Just drop the stream; client will see the connection closed.
            return;
        }
    }

    let client_id = next_client_id();
    let (entry, queue) = client_channel(limits.queue_capacity);

    if !coordinator.register(client_id, entry) {
        return;
    }
    debug!(%client_id, %peer, "accepted connection");

    tokio::spawn(client::run_client(
        client_id,
        stream,
        queue,
        coordinator.clone(),
        limits.max_line_len,
        shutdown.clone(),
    ));
}
