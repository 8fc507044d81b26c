//! Block framing.
//!
//! Every block starts with an 8-byte header: payload size and message count,
//! both `u32` big-endian. We send exactly one message per block, and
//! LibreOffice does the same in practice.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, UrpError};

/// Upper bound on an incoming block; anything larger is treated as a
/// corrupted stream.
pub const MAX_BLOCK: usize = 64 * 1024 * 1024;

pub struct BlockStream<S> {
    io: S,
}

impl<S> BlockStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: S) -> Self {
        Self { io }
    }

    pub async fn send(&mut self, message: &[u8]) -> Result<()> {
        let mut header = [0u8; 8];
        header[..4].copy_from_slice(&(message.len() as u32).to_be_bytes());
        header[4..].copy_from_slice(&1u32.to_be_bytes());
        self.io.write_all(&header).await?;
        self.io.write_all(message).await?;
        self.io.flush().await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<Bytes> {
        let mut header = [0u8; 8];
        if let Err(e) = self.io.read_exact(&mut header).await {
            return Err(match e.kind() {
                std::io::ErrorKind::UnexpectedEof => UrpError::ConnectionClosed,
                _ => UrpError::Io(e),
            });
        }
        let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let count = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        if size > MAX_BLOCK {
            return Err(UrpError::Protocol(format!("block of {size} bytes exceeds limit")));
        }
        if count > 1 {
            tracing::warn!(count, "block carries several messages; decoding the first");
        }
        let mut payload = BytesMut::zeroed(size);
        self.io.read_exact(&mut payload).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => UrpError::ConnectionClosed,
            _ => UrpError::Io(e),
        })?;
        Ok(payload.freeze())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.io.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_cross_a_duplex_pipe() {
        let (a, b) = tokio::io::duplex(1024);
        let mut left = BlockStream::new(a);
        let mut right = BlockStream::new(b);

        left.send(b"first").await.unwrap();
        left.send(b"").await.unwrap();
        left.send(b"third").await.unwrap();

        assert_eq!(right.recv().await.unwrap().as_ref(), b"first");
        assert!(right.recv().await.unwrap().is_empty());
        assert_eq!(right.recv().await.unwrap().as_ref(), b"third");
    }

    #[tokio::test]
    async fn eof_reports_closed_connection() {
        let (a, b) = tokio::io::duplex(64);
        drop(a);
        let mut right = BlockStream::new(b);
        assert!(matches!(right.recv().await, Err(UrpError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn oversized_block_is_rejected() {
        let (mut a, b) = tokio::io::duplex(64);
        a.write_all(&[0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 1]).await.unwrap();
        let mut right = BlockStream::new(b);
        assert!(matches!(right.recv().await, Err(UrpError::Protocol(_))));
    }
}
