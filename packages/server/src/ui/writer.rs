//! Per-session writer task.
//!
//! The only code that writes to a client's socket. It drains the session's
//! outbox in order, flushing after every item, and bounds each write with a
//! timeout so a stalled client cannot hold anything up.

use std::time::Duration;

use futures_util::SinkExt;
use tokio::{io::AsyncWrite, sync::mpsc, task::JoinHandle};
use tokio_util::{codec::FramedWrite, sync::CancellationToken};

use crate::{
    domain::SessionError,
    infrastructure::codec::{ChatLineCodec, Outbound},
};

/// Spawns a task that receives items from `rx` and pushes them to `writer`.
///
/// When every sender is gone the remaining items are flushed and the write
/// side is shut down. On a write error or timeout `closer` is cancelled so the
/// session's read loop winds down as well.
///
/// # Returns
///
/// A `JoinHandle` resolving to how the writer ended
pub fn pusher_loop<W>(
    writer: W,
    mut rx: mpsc::Receiver<Outbound>,
    write_timeout: Duration,
    closer: CancellationToken,
) -> JoinHandle<Result<(), SessionError>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut sink = FramedWrite::new(writer, ChatLineCodec::default());

        while let Some(item) = rx.recv().await {
            let result = match tokio::time::timeout(write_timeout, sink.send(item)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(SessionError::Write(e)),
                Err(_) => Err(SessionError::WriteTimeout(write_timeout)),
            };
            if let Err(e) = result {
                closer.cancel();
                return Err(e);
            }
        }

        match tokio::time::timeout(write_timeout, sink.close()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SessionError::Write(e)),
            Err(_) => Err(SessionError::WriteTimeout(write_timeout)),
        }
    })
}
