//! Background reader draining a shell's output stream.
//!
//! The reader task owns the output half of the shell. Every read is
//! decoded, stripped of carriage returns and pushed as one chunk into a
//! bounded queue. When the queue is full the task waits, so chunks are
//! never dropped and always arrive in the order they were read.

use bytes::BytesMut;
use log::{debug, trace};
use memchr::memchr;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Size of a single read from the output stream.
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Result of a non-blocking poll of the queue.
#[derive(Debug, PartialEq, Eq)]
pub enum Poll {
    /// A chunk was waiting.
    Chunk(String),
    /// Nothing is queued right now.
    Empty,
    /// The reader task has ended and the queue is drained.
    Closed,
}

/// Handle to the reader task and the receiving end of its queue.
#[derive(Debug)]
pub struct ResponseReader {
    rx: mpsc::Receiver<String>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl ResponseReader {
    /// Spawn a reader task over `stream`, queueing at most `depth` chunks.
    pub fn spawn<R>(stream: R, depth: usize) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(depth.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(read_loop(stream, tx, shutdown_rx));

        Self {
            rx,
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    /// Take the next chunk if one is queued, without waiting.
    pub fn try_next(&mut self) -> Poll {
        match self.rx.try_recv() {
            Ok(chunk) => Poll::Chunk(chunk),
            Err(TryRecvError::Empty) => Poll::Empty,
            Err(TryRecvError::Disconnected) => Poll::Closed,
        }
    }

    /// Wait for the next chunk. Returns `None` once the reader has ended
    /// and every queued chunk was consumed.
    pub async fn next(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Discard every queued chunk, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let mut discarded = 0;
        while let Ok(chunk) = self.rx.try_recv() {
            trace!("discarding stale chunk: {:?}", chunk);
            discarded += 1;
        }
        discarded
    }

    /// Whether the reader task is still running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signal the task to stop and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.rx.close();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for ResponseReader {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read_loop<R>(mut stream: R, tx: mpsc::Sender<String>, mut shutdown: oneshot::Receiver<()>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut pending = BytesMut::with_capacity(READ_BUFFER_SIZE);

    loop {
        let n = tokio::select! {
            _ = &mut shutdown => {
                debug!("reader: shutdown requested");
                return;
            }
            read = stream.read(&mut buf) => match read {
                Ok(0) => {
                    debug!("reader: end of stream");
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    debug!("reader: stream error: {}", e);
                    break;
                }
            },
        };

        pending.extend_from_slice(&buf[..n]);
        let chunk = normalize_line_feeds(take_utf8(&mut pending));
        if chunk.is_empty() {
            continue;
        }

        trace!("reader: {} bytes queued", chunk.len());

        tokio::select! {
            _ = &mut shutdown => return,
            sent = tx.send(chunk) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }

    // A character cut off by the end of the stream is still output.
    if pending.is_empty() {
        return;
    }
    let tail = normalize_line_feeds(String::from_utf8_lossy(&pending).into_owned());
    if !tail.is_empty() {
        tokio::select! {
            _ = &mut shutdown => {}
            _ = tx.send(tail) => {}
        }
    }
}

/// Split off the longest prefix of `pending` that is complete UTF-8.
///
/// A multi-byte character cut in half by a read stays in `pending` until
/// the rest arrives; genuinely invalid bytes are replaced.
fn take_utf8(pending: &mut BytesMut) -> String {
    let mut text = String::new();
    loop {
        let (valid, invalid) = match std::str::from_utf8(pending) {
            Ok(_) => (pending.len(), None),
            Err(e) => (e.valid_up_to(), e.error_len()),
        };
        let bytes = pending.split_to(valid + invalid.unwrap_or(0));
        text.push_str(&String::from_utf8_lossy(&bytes));
        if invalid.is_none() {
            return text;
        }
    }
}

/// Strip every `\r`, so `\r\n` and `\r\r\n` become `\n`.
pub fn normalize_line_feeds(text: String) -> String {
    if memchr(b'\r', text.as_bytes()).is_none() {
        return text;
    }
    text.replace('\r', "")
}
