//! Length-prefixed framing.
//!
//! A frame is a 4-byte little-endian length `L` followed by exactly `L`
//! bytes of payload. The reader accumulates the body with reads of at most
//! `chunk_size` bytes, so a short read never ends a frame early and a large
//! frame takes several reads.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::utils::error::FrameError;

pub const PREFIX_LEN: usize = 4;
pub const DEFAULT_CHUNK_SIZE: usize = 50;
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Turns a byte stream into a sequence of frame payloads.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    chunk_size: usize,
    max_frame_len: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_limits(inner, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FRAME_LEN)
    }

    pub fn with_limits(inner: R, chunk_size: usize, max_frame_len: usize) -> Self {
        Self {
            inner,
            chunk_size: chunk_size.max(1),
            max_frame_len,
        }
    }

    /// Read the next complete payload.
    ///
    /// Any read failure, including end of stream, ends the stream for good:
    /// there is no way to find the next prefix after a partial frame.
    pub async fn next_frame(&mut self) -> Result<Bytes, FrameError> {
        let mut prefix = [0u8; PREFIX_LEN];
        self.inner
            .read_exact(&mut prefix)
            .await
            .map_err(closed_or_io)?;

        let len = u32::from_le_bytes(prefix) as usize;
        if len > self.max_frame_len {
            return Err(FrameError::TooLarge {
                len,
                max: self.max_frame_len,
            });
        }

        let mut payload = BytesMut::with_capacity(len);
        let mut chunk = vec![0u8; self.chunk_size.min(len)];
        while payload.len() < len {
            let want = (len - payload.len()).min(self.chunk_size);
            let n = self.inner.read(&mut chunk[..want]).await?;
            if n == 0 {
                return Err(FrameError::Closed);
            }
            payload.put_slice(&chunk[..n]);
        }

        Ok(payload.freeze())
    }
}

fn closed_or_io(err: std::io::Error) -> FrameError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        FrameError::Closed
    } else {
        FrameError::Io(err)
    }
}

/// Prefix `payload` with its little-endian `u32` length.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, FrameError> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::Oversized(payload.len()))?;
    let mut frame = BytesMut::with_capacity(PREFIX_LEN + payload.len());
    frame.put_u32_le(len);
    frame.put_slice(payload);
    Ok(frame.freeze())
}

/// Encode and write one frame, flushing afterwards.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let frame = encode_frame(payload)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
