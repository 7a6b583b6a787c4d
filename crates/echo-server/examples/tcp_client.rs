//! Interactive line client for echo-server.
//!
//! Every line typed on stdin is sent to the server; every line the server
//! broadcasts (from any client) is printed with a `<<` prefix.

use std::env;
use std::error::Error;

use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Where to connect: env override or default.
    let addr = env::var("ECHO_CLIENT_ADDR").unwrap_or_else(|_| "127.0.0.1:9000".to_string());

    println!("Connecting to {}...", addr);
    let stream = TcpStream::connect(&addr).await?;
    println!("Connected. Type lines to broadcast; 'quit' or EOF to leave.\n");

    let (read_half, mut write_half) = stream.into_split();

    let printer = tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => println!("<< {}", line),
                Ok(None) => {
                    println!("Server closed the connection.");
                    break;
                }
                Err(e) => {
                    eprintln!("Read error: {:?}", e);
                    break;
                }
            }
        }
    });

    let mut stdin = BufReader::new(io::stdin()).lines();
    while let Some(line) = stdin.next_line().await? {
        if line.trim().eq_ignore_ascii_case("quit") {
            break;
        }
        write_half.write_all(line.as_bytes()).await?;
        write_half.write_all(b"\n").await?;
    }

    write_half.shutdown().await?;
    let _ = printer.await;
    Ok(())
}
