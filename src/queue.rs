//! Fixed worker pool draining a bounded FIFO of file paths.
//!
//! Built on `crossbeam_channel::bounded`, which already implements the
//! contract the run needs: a full channel blocks the producer's `send`
//! until a worker makes room, and closing the sender side (rather than
//! a separate done-flag) wakes every blocked receiver with a clean
//! "no more work" signal. That lets `finalize` be nothing more than
//! "drop the sender, then join every worker" — inherently idempotent,
//! since joining an already-joined handle a second time is avoided by
//! taking the handles out of the pool once.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Sender};

/// Spawns `worker_count` threads that each repeatedly pull a path from
/// the queue and hand it to `callback`. `callback` must not panic on
/// ordinary failures — it owns its own error reporting (see the
/// per-file error kind in the crate's error design) and a panicking
/// callback would simply kill that one worker thread silently.
pub struct WorkQueue {
    sender: Option<Sender<PathBuf>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkQueue {
    pub fn start<F>(worker_count: usize, callback: F) -> Self
    where
        F: Fn(PathBuf) + Send + Sync + 'static,
    {
        let worker_count = worker_count.max(1);
        let queue_depth = worker_count * 4;
        let (sender, receiver) = bounded::<PathBuf>(queue_depth);
        let callback = Arc::new(callback);

        let workers = (0..worker_count)
            .map(|_| {
                let receiver = receiver.clone();
                let callback = Arc::clone(&callback);
                std::thread::spawn(move || {
                    for path in receiver.iter() {
                        callback(path);
                    }
                })
            })
            .collect();

        Self {
            sender: Some(sender),
            workers,
        }
    }

    /// Blocks the calling (producer) thread while the queue is full.
    pub fn enqueue(&self, path: PathBuf) {
        if let Some(sender) = &self.sender {
            // The only send error is a disconnected receiver side,
            // which only happens after `finalize` has already run.
            let _ = sender.send(path);
        }
    }

    /// Signals completion and joins every worker. Idempotent: the
    /// sender is taken once, so a second call is a no-op, and worker
    /// handles are drained once so a second call has nothing to join.
    pub fn finalize(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.finalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn processes_every_enqueued_item() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut queue = WorkQueue::start(4, move |_path| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        for i in 0..50 {
            queue.enqueue(PathBuf::from(format!("file{i}")));
        }
        queue.finalize();

        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut queue = WorkQueue::start(2, |_| {});
        queue.enqueue(PathBuf::from("a"));
        queue.finalize();
        queue.finalize();
    }

    #[test]
    fn single_worker_minimum() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let mut queue = WorkQueue::start(0, move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });
        queue.enqueue(PathBuf::from("a"));
        queue.finalize();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_error_does_not_stop_other_items() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut queue = WorkQueue::start(3, move |path| {
            if path == PathBuf::from("bad") {
                return; // callback owns its own failure handling
            }
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        queue.enqueue(PathBuf::from("bad"));
        for i in 0..10 {
            queue.enqueue(PathBuf::from(format!("ok{i}")));
        }
        queue.finalize();

        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }
}
