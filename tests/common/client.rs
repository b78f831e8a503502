//! Test line client.
//!
//! Sends raw lines to the gateway and asserts on the replies.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A test gateway client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

#[allow(dead_code)]
impl TestClient {
    /// Connect without identifying.
    pub async fn connect(address: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        })
    }

    /// Connect, send `HELLO <id>` and consume the welcome notice.
    pub async fn hello(address: SocketAddr, id: i64) -> anyhow::Result<Self> {
        let mut client = Self::connect(address).await?;
        client.send(&format!("HELLO {id}")).await?;
        let welcome = client.recv().await?;
        anyhow::ensure!(welcome.starts_with("NOTICE "), "unexpected greeting: {welcome}");
        Ok(client)
    }

    pub async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive one line.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let read = timeout(dur, self.reader.read_line(&mut line)).await??;
        anyhow::ensure!(read > 0, "connection closed");
        Ok(line.trim_end().to_string())
    }

    /// Receive lines until one contains `needle`. Returns that line.
    pub async fn expect(&mut self, needle: &str) -> anyhow::Result<String> {
        loop {
            let line = self.recv().await?;
            if line.contains(needle) {
                return Ok(line);
            }
        }
    }

    /// Assert nothing arrives for a short while.
    pub async fn expect_silence(&mut self) -> anyhow::Result<()> {
        match self.recv_timeout(Duration::from_millis(150)).await {
            Ok(line) => anyhow::bail!("unexpected line: {line}"),
            Err(_) => Ok(()),
        }
    }
}
