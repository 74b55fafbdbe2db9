//! Frame source abstraction for telemetry ingestion.
//!
//! Live gateways broadcast frames over UDP; captured traffic can be replayed
//! from a file of hex-encoded frames, one per line.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::UdpSocket;

/// Largest datagram accepted from a gateway
pub const MAX_DATAGRAM_LEN: usize = 2048;

/// Events produced by a frame source.
#[derive(Debug)]
pub enum FrameEvent {
    /// Raw frame bytes, with the sender when known.
    Frame(Vec<u8>, Option<SocketAddr>),
    /// Source is exhausted. UDP sources never report this.
    Eof,
}

/// Trait abstracting where raw frames come from.
///
/// The listener loop calls [`next_frame`](FrameSource::next_frame) inside a
/// `select!` with cancellation.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Wait for the next frame.
    ///
    /// An `Err` covers one failed receive. The loop counts it and asks
    /// again, so a source that cannot recover should keep returning `Err`.
    async fn next_frame(&mut self) -> Result<FrameEvent>;

    /// Human-readable name for logging (e.g. "UDP", "replay").
    fn source_name(&self) -> &str;
}

// ============================================================================
// UDP Source (live gateway broadcasts)
// ============================================================================

pub struct UdpSource {
    socket: UdpSocket,
    buffer: Vec<u8>,
}

impl UdpSource {
    pub fn new(socket: UdpSocket) -> Self {
        Self {
            socket,
            buffer: vec![0u8; MAX_DATAGRAM_LEN],
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl FrameSource for UdpSource {
    async fn next_frame(&mut self) -> Result<FrameEvent> {
        let (len, peer) = self
            .socket
            .recv_from(&mut self.buffer)
            .await
            .context("UDP receive failed")?;
        Ok(FrameEvent::Frame(self.buffer[..len].to_vec(), Some(peer)))
    }

    fn source_name(&self) -> &str {
        "UDP"
    }
}

// ============================================================================
// Replay Source (hex-encoded frames from a file)
// ============================================================================

/// Replays captured frames with an optional delay between them.
pub struct ReplaySource {
    frames: std::vec::IntoIter<Vec<u8>>,
    delay_ms: u64,
    yielded_first: bool,
}

impl ReplaySource {
    pub fn new(frames: Vec<Vec<u8>>, delay_ms: u64) -> Self {
        Self {
            frames: frames.into_iter(),
            delay_ms,
            yielded_first: false,
        }
    }

    /// Load a capture file. Blank lines and lines starting with `#` are
    /// ignored; whitespace inside a line is allowed.
    pub fn from_file(path: &Path, delay_ms: u64) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading replay file {}", path.display()))?;

        let mut frames = Vec::new();
        for (n, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let digits: String = line.split_whitespace().collect();
            let frame = hex::decode(digits)
                .with_context(|| format!("{}:{}: invalid hex frame", path.display(), n + 1))?;
            frames.push(frame);
        }

        tracing::info!(path = %path.display(), frames = frames.len(), "Replay capture loaded");
        Ok(Self::new(frames, delay_ms))
    }
}

#[async_trait]
impl FrameSource for ReplaySource {
    async fn next_frame(&mut self) -> Result<FrameEvent> {
        if self.yielded_first && self.delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
        }
        match self.frames.next() {
            Some(frame) => {
                self.yielded_first = true;
                Ok(FrameEvent::Frame(frame, None))
            }
            None => Ok(FrameEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "replay"
    }
}
