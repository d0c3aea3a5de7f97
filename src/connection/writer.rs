//! Per-socket write path.
//!
//! A socket can be registered on several routes, and each route's listener
//! delivers from its own task. The write half is owned by one writer task
//! per socket; everyone else holds a `ConnectionWriter`, which only queues
//! encoded frames on that task's channel. A peer that stops reading stalls
//! its own writer task and nothing else.

use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::protocol::frame::encode_frame;
use crate::utils::error::{DeliveryError, FrameError};

enum Outbound {
    Frame(Bytes),
    Close,
}

#[derive(Clone)]
pub struct ConnectionWriter {
    sender: mpsc::UnboundedSender<Outbound>,
    closed: Arc<AtomicBool>,
    peer: Arc<str>,
}

impl ConnectionWriter {
    /// Take ownership of `writer` and spawn the task that drains frames
    /// into it. Must be called from within a tokio runtime.
    pub fn new<W>(writer: W, peer: impl Into<Arc<str>>) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let peer: Arc<str> = peer.into();

        tokio::spawn(write_loop(
            writer,
            receiver,
            Arc::clone(&closed),
            Arc::clone(&peer),
        ));

        Self {
            sender,
            closed,
            peer,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Frame `payload` and hand it to the writer task. Frames from one
    /// `ConnectionWriter` (and its clones) reach the socket whole and in the
    /// order they were sent. Succeeds once the frame is queued; a write
    /// failure shows up as `ConnectionClosed` on later sends.
    pub fn send(&self, payload: &[u8]) -> Result<(), DeliveryError> {
        if self.is_closed() {
            return Err(DeliveryError::ConnectionClosed);
        }
        let frame = encode_frame(payload).map_err(|err| match err {
            FrameError::Io(io) => DeliveryError::Other(io),
            other => DeliveryError::Other(std::io::Error::new(ErrorKind::InvalidInput, other)),
        })?;

        self.sender.send(Outbound::Frame(frame)).map_err(|_| {
            self.closed.store(true, Ordering::SeqCst);
            DeliveryError::ConnectionClosed
        })
    }

    /// Mark the connection closed. Frames already queued are still written,
    /// then the write half is shut down. Later sends fail with
    /// `ConnectionClosed`.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // The writer task is gone already if the socket failed.
        let _ = self.sender.send(Outbound::Close);
    }
}

impl std::fmt::Debug for ConnectionWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionWriter")
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn write_loop<W>(
    mut writer: W,
    mut receiver: mpsc::UnboundedReceiver<Outbound>,
    closed: Arc<AtomicBool>,
    peer: Arc<str>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(outbound) = receiver.recv().await {
        let frame = match outbound {
            Outbound::Frame(frame) => frame,
            Outbound::Close => break,
        };
        let result = match writer.write_all(&frame).await {
            Ok(()) => writer.flush().await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            closed.store(true, Ordering::SeqCst);
            if is_closed_error(&err) {
                tracing::debug!(%peer, error = %err, "peer went away");
            } else {
                tracing::warn!(%peer, error = %err, "socket write failed");
            }
            break;
        }
    }

    closed.store(true, Ordering::SeqCst);
    receiver.close();
    if let Err(e) = writer.shutdown().await {
        tracing::debug!(%peer, error = %e, "shutdown of closed socket failed");
    }
    tracing::trace!(%peer, "send loop closed");
}

fn is_closed_error(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::WriteZero
            | ErrorKind::UnexpectedEof
    )
}
