//! Byte-counting stream adapter for request bodies.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use modeldock_uploader::TransferEvent;
use tokio::sync::mpsc;

/// Which kind of transfer event a counted stream reports.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ProgressTarget {
    /// Aggregate counter across all parts of one multipart body.
    Aggregate,
    /// Native counter for a single file.
    File { file_index: usize },
}

/// Wraps a chunk stream and reports the running byte total after each chunk.
///
/// The counter is shared: every part of a multipart body increments the same
/// `AtomicU64`, so aggregate events carry "bytes uploaded so far" for the
/// whole request in part order. Per-file uploads get a fresh counter, making
/// the same total a native per-file count.
pub(crate) struct ProgressStream<S> {
    inner: S,
    counter: Arc<AtomicU64>,
    target: ProgressTarget,
    events: mpsc::UnboundedSender<TransferEvent>,
}

impl<S> ProgressStream<S> {
    pub(crate) fn new(
        inner: S,
        counter: Arc<AtomicU64>,
        target: ProgressTarget,
        events: mpsc::UnboundedSender<TransferEvent>,
    ) -> Self {
        Self {
            inner,
            counter,
            target,
            events,
        }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let poll = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(Some(Ok(chunk))) = &poll {
            let len = chunk.len() as u64;
            let bytes_uploaded = self.counter.fetch_add(len, Ordering::SeqCst) + len;
            let event = match self.target {
                ProgressTarget::Aggregate => TransferEvent::Aggregate { bytes_uploaded },
                ProgressTarget::File { file_index } => TransferEvent::File {
                    file_index,
                    bytes_uploaded,
                },
            };
            let _ = self.events.send(event);
        }
        poll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tokio_util::io::ReaderStream;

    #[tokio::test]
    async fn reports_running_total_per_chunk() {
        let data = vec![7u8; 10_000];
        let (tx, mut rx) = mpsc::unbounded_channel();
        let counter = Arc::new(AtomicU64::new(0));

        let mut stream = ProgressStream::new(
            ReaderStream::with_capacity(&data[..], 4096),
            Arc::clone(&counter),
            ProgressTarget::Aggregate,
            tx,
        );

        let mut forwarded = 0u64;
        while let Some(chunk) = stream.next().await {
            forwarded += chunk.unwrap().len() as u64;
        }
        assert_eq!(forwarded, 10_000);
        assert_eq!(counter.load(Ordering::SeqCst), 10_000);

        let mut last = 0u64;
        while let Ok(ev) = rx.try_recv() {
            match ev {
                TransferEvent::Aggregate { bytes_uploaded } => {
                    assert!(bytes_uploaded > last);
                    last = bytes_uploaded;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(last, 10_000);
    }

    #[tokio::test]
    async fn shared_counter_spans_parts() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let counter = Arc::new(AtomicU64::new(0));

        for data in [vec![1u8; 300], vec![2u8; 100]] {
            let mut stream = ProgressStream::new(
                ReaderStream::new(std::io::Cursor::new(data)),
                Arc::clone(&counter),
                ProgressTarget::Aggregate,
                tx.clone(),
            );
            while stream.next().await.is_some() {}
        }

        let mut last = 0u64;
        while let Ok(TransferEvent::Aggregate { bytes_uploaded }) = rx.try_recv() {
            last = bytes_uploaded;
        }
        // The second part continues where the first stopped.
        assert_eq!(last, 400);
    }

    #[tokio::test]
    async fn file_target_counts_natively() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut stream = ProgressStream::new(
            ReaderStream::new(&b"weights"[..]),
            Arc::new(AtomicU64::new(0)),
            ProgressTarget::File { file_index: 2 },
            tx,
        );
        while stream.next().await.is_some() {}

        match rx.try_recv().unwrap() {
            TransferEvent::File {
                file_index,
                bytes_uploaded,
            } => {
                assert_eq!(file_index, 2);
                assert_eq!(bytes_uploaded, 7);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
