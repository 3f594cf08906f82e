//! Write-behind queue: callers enqueue and move on, a single writer thread
//! owns the store and applies operations in order.
//!
//! The writer is a plain OS thread, so store I/O never blocks the async
//! runtime and a queue can be created with or without one.

use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::store::{CacheKey, Corrections, KvStore};

enum PersistOp {
    Corrections(Corrections),
    Vector(CacheKey, Vec<f32>),
    Clear,
    Flush(oneshot::Sender<()>),
}

/// Handle to the writer thread. Dropping it lets the writer drain and exit.
pub struct PersistQueue {
    tx: mpsc::UnboundedSender<PersistOp>,
}

impl PersistQueue {
    /// Start the writer. If the thread cannot be started, every later write
    /// is logged and kept in memory only.
    pub fn spawn(store: Box<dyn KvStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let started = thread::Builder::new()
            .name("penny-persist".to_string())
            .spawn(move || run_writer(rx, store));
        if let Err(e) = started {
            warn!(error = %e, "could not start persist writer; corrections will not persist");
        }
        Self { tx }
    }

    fn send(&self, op: PersistOp) -> bool {
        if self.tx.send(op).is_err() {
            warn!("persist writer has stopped; change kept in memory only");
            return false;
        }
        true
    }

    pub fn save_corrections(&self, corrections: Corrections) {
        self.send(PersistOp::Corrections(corrections));
    }

    pub fn put_vector(&self, key: CacheKey, vector: Vec<f32>) {
        self.send(PersistOp::Vector(key, vector));
    }

    pub fn clear(&self) {
        self.send(PersistOp::Clear);
    }

    /// Wait until everything queued before this call has been written.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.send(PersistOp::Flush(done_tx)) {
            let _ = done_rx.await;
        }
    }

    /// [`flush`](Self::flush) for callers outside async code. Panics if
    /// called from within an async context.
    pub fn flush_blocking(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.send(PersistOp::Flush(done_tx)) {
            let _ = done_rx.blocking_recv();
        }
    }
}

fn run_writer(mut rx: mpsc::UnboundedReceiver<PersistOp>, mut store: Box<dyn KvStore>) {
    while let Some(op) = rx.blocking_recv() {
        let res = match op {
            PersistOp::Corrections(c) => store.save_corrections(&c),
            PersistOp::Vector(key, v) => store.put_vector(&key, &v),
            PersistOp::Clear => store.clear(),
            PersistOp::Flush(done) => {
                let _ = done.send(());
                Ok(())
            }
        };
        if let Err(e) = res {
            warn!(error = %e, "persist write failed; continuing in memory");
        }
    }
    debug!("persist writer finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use penny_core::Category;

    struct FailingStore;

    impl KvStore for FailingStore {
        fn load_corrections(&self) -> Result<Corrections, StoreError> {
            Ok(Corrections::new())
        }
        fn save_corrections(&mut self, _c: &Corrections) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
        fn load_vectors(&self) -> Result<Vec<(CacheKey, Vec<f32>)>, StoreError> {
            Ok(Vec::new())
        }
        fn put_vector(&mut self, _k: &CacheKey, _v: &[f32]) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
        fn clear(&mut self) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    #[tokio::test]
    async fn test_writes_apply_in_order() {
        let store = MemoryStore::new();
        let queue = PersistQueue::spawn(Box::new(store.clone()));

        let mut first = Corrections::new();
        first.insert("SHOPEE".to_string(), Category::Shopping);
        let mut second = first.clone();
        second.insert("SHOPEE".to_string(), Category::GiftsDonations);

        queue.save_corrections(first);
        queue.save_corrections(second.clone());
        queue.put_vector(CacheKey::new("SHOPEE", None), vec![1.0]);
        queue.flush().await;

        assert_eq!(store.load_corrections().unwrap(), second);
        assert_eq!(store.load_vectors().unwrap().len(), 1);

        queue.clear();
        queue.flush().await;
        assert!(store.load_vectors().unwrap().is_empty());
    }

    #[test]
    fn test_works_without_a_runtime() {
        let store = MemoryStore::new();
        let queue = PersistQueue::spawn(Box::new(store.clone()));
        queue.put_vector(CacheKey::new("NETFLIX.COM", None), vec![0.6, 0.8]);
        queue.flush_blocking();
        assert_eq!(store.load_vectors().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_current_thread_runtime_is_not_blocked() {
        let store = MemoryStore::new();
        let queue = PersistQueue::spawn(Box::new(store.clone()));
        for i in 0..100 {
            queue.put_vector(CacheKey::new(format!("SHOP {i}"), None), vec![1.0]);
        }
        queue.flush().await;
        assert_eq!(store.load_vectors().unwrap().len(), 100);
    }

    #[tokio::test]
    async fn test_write_errors_are_swallowed() {
        let queue = PersistQueue::spawn(Box::new(FailingStore));
        queue.put_vector(CacheKey::new("A", None), vec![1.0]);
        queue.clear();
        // the writer keeps running after failures
        queue.flush().await;
        queue.flush().await;
    }
}
