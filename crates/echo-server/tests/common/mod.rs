// Shared helpers for the echo-server integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Result};
use echo_server::{Config, EchoServer};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

pub const READ_TIMEOUT: Duration = Duration::from_secs(3);
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

pub fn loopback_config() -> Config {
    Config {
        bind_addr: "127.0.0.1".to_string(),
        port: 0,
        ..Config::default()
    }
}

pub async fn start_server(config: Config) -> Result<(EchoServer, SocketAddr)> {
    let mut server = EchoServer::new(config);
    let addr = server.start().await?;
    Ok((server, addr))
}

/// Poll `count()` until it equals `expected`.
pub async fn wait_for_count(server: &EchoServer, expected: usize) -> Result<()> {
    let deadline = Instant::now() + READ_TIMEOUT;
    loop {
        let count = server.count().await;
        if count == expected {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!("count stuck at {count}, expected {expected}");
        }
        sleep(Duration::from_millis(10)).await;
    }
}

pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }

    pub async fn send(&mut self, data: &str) -> Result<()> {
        self.writer.write_all(data.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Half-close: the server sees end-of-stream, we can still read.
    pub async fn finish_sending(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }

    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = timeout(READ_TIMEOUT, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            bail!("connection closed while waiting for a line");
        }
        Ok(line)
    }

    /// Nothing arrives for a short while.
    pub async fn expect_silence(&mut self) -> Result<()> {
        let mut line = String::new();
        let result = timeout(QUIET_PERIOD, self.reader.read_line(&mut line)).await;
        match result {
            Err(_) => Ok(()),
            Ok(result) => bail!("expected silence, got {result:?} with {line:?}"),
        }
    }

    /// Read and discard whatever is buffered until the server closes the
    /// connection. Returns how many bytes were discarded.
    pub async fn drain_until_closed(&mut self) -> Result<usize> {
        let drain = async {
            let mut buf = vec![0u8; 64 * 1024];
            let mut total = 0;
            loop {
                match self.reader.read(&mut buf).await {
                    Ok(0) | Err(_) => return total,
                    Ok(n) => total += n,
                }
            }
        };
        Ok(timeout(READ_TIMEOUT, drain).await?)
    }

    /// The server closed the connection (clean EOF or reset).
    pub async fn expect_closed(&mut self) -> Result<()> {
        let mut buf = [0u8; 64];
        let result = timeout(READ_TIMEOUT, self.reader.read(&mut buf)).await?;
        match result {
            Ok(0) | Err(_) => Ok(()),
            Ok(n) => bail!("expected close, read {:?}", String::from_utf8_lossy(&buf[..n])),
        }
    }
}
