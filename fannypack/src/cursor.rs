//! Bridges push-style producers into the pull-based [`Cursor`] contract.
//!
//! A producer that is called back per item (or that should run ahead of the
//! consumer) writes into a bounded channel; the consumer pulls from it. The
//! bound is the read-ahead depth. When the consumer drops its end, the next
//! send reports failure and the producer stops.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::store::Cursor;

/// Creates a connected sender and cursor holding at most `depth` items in
/// flight. A depth of zero is treated as one.
pub fn channel<T: Send>(depth: usize) -> (CursorSender<T>, ChannelCursor<T>) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    (CursorSender { tx }, ChannelCursor { rx })
}

/// Producer half of [`channel`].
pub struct CursorSender<T> {
    tx: mpsc::Sender<Result<T>>,
}

impl<T: Send> CursorSender<T> {
    /// Pushes an item, waiting while the buffer is full.
    ///
    /// Returns `false` once the consumer is gone.
    pub async fn send(&self, item: T) -> bool {
        self.tx.send(Ok(item)).await.is_ok()
    }

    /// Ends the sequence with an error the consumer will observe.
    pub async fn fail(&self, err: Error) -> bool {
        self.tx.send(Err(err)).await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of [`channel`].
///
/// The sequence ends when every sender is dropped.
pub struct ChannelCursor<T> {
    rx: mpsc::Receiver<Result<T>>,
}

impl<T: Send + 'static> ChannelCursor<T> {
    /// Drives `source` on a spawned task, keeping up to `depth` items ready.
    ///
    /// Must be called within a tokio runtime. The task ends when the source
    /// is exhausted, fails, or the returned cursor is dropped.
    pub fn spawn<C>(mut source: C, depth: usize) -> Self
    where
        C: Cursor<Item = T> + 'static,
    {
        let (tx, cursor) = channel(depth);
        tokio::spawn(async move {
            loop {
                match source.next().await {
                    Ok(Some(item)) => {
                        if !tx.send(item).await {
                            tracing::trace!("read-ahead consumer dropped");
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tx.fail(err).await;
                        break;
                    }
                }
            }
        });
        cursor
    }
}

#[async_trait]
impl<T: Send> Cursor for ChannelCursor<T> {
    type Item = T;

    async fn next(&mut self) -> Result<Option<T>> {
        match self.rx.recv().await {
            Some(item) => item.map(Some),
            None => Ok(None),
        }
    }
}
