//! Unbounded FIFO queue shared by stream readers and the caller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use super::record::LineRecord;

/// Thread-safe, unbounded queue of [`LineRecord`]s.
///
/// `put` never blocks. Consumers serialize on an internal lock, so a batch
/// drain is never interleaved with another consumer's `get`.
pub struct OutputChannel {
    tx: mpsc::UnboundedSender<LineRecord>,
    rx: Mutex<mpsc::UnboundedReceiver<LineRecord>>,
    len: AtomicUsize,
}

impl OutputChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            len: AtomicUsize::new(0),
        }
    }

    /// Enqueue a record.
    pub fn put(&self, record: LineRecord) {
        self.len.fetch_add(1, Ordering::SeqCst);
        // The receiver lives as long as `self`, so send cannot fail here
        if self.tx.send(record).is_err() {
            self.len.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Wait up to `timeout` for the next record.
    ///
    /// Returns `None` if nothing arrived in time.
    pub async fn get(&self, timeout: Duration) -> Option<LineRecord> {
        let received = tokio::time::timeout(timeout, async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        })
        .await
        .ok()
        .flatten();

        if received.is_some() {
            self.len.fetch_sub(1, Ordering::SeqCst);
        }
        received
    }

    /// Take every record currently buffered, without waiting.
    pub async fn drain(&self) -> Vec<LineRecord> {
        let mut rx = self.rx.lock().await;
        self.drain_locked(&mut rx)
    }

    /// Wait up to `timeout` for the first record, then take it together
    /// with everything else already buffered.
    ///
    /// Returns `None` if nothing arrived in time.
    pub async fn get_batch(&self, timeout: Duration) -> Option<Vec<LineRecord>> {
        tokio::time::timeout(timeout, async {
            let mut rx = self.rx.lock().await;
            let first = rx.recv().await?;
            self.len.fetch_sub(1, Ordering::SeqCst);

            let mut records = vec![first];
            records.extend(self.drain_locked(&mut rx));
            Some(records)
        })
        .await
        .ok()
        .flatten()
    }

    fn drain_locked(&self, rx: &mut mpsc::UnboundedReceiver<LineRecord>) -> Vec<LineRecord> {
        let mut records = Vec::new();
        while let Ok(record) = rx.try_recv() {
            self.len.fetch_sub(1, Ordering::SeqCst);
            records.push(record);
        }
        records
    }

    /// Number of buffered records (snapshot).
    pub fn len(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    /// Check if no records are buffered (snapshot).
    ///
    /// Racy by nature: fine for polling, not for synchronization.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for OutputChannel {
    fn default() -> Self {
        Self::new()
    }
}
