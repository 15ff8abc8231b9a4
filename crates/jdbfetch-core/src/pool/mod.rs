//! Fixed-size worker pool with explicit lifecycle and per-task outcomes.
//!
//! The caller owns the pool: [`WorkerPool::start`] spawns `size` named
//! threads that pull items from a shared FIFO queue, run the handler, and send
//! each outcome back on a channel. The caller can resubmit items while the
//! pool runs (retries go through the same queue), wait for quiescence with
//! [`WorkerPool::drain`], and stop it with [`WorkerPool::close`] plus
//! [`WorkerPool::join`]. Dropping a pool closes and joins it.

use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;

/// A handler panicked while running one item.
#[derive(Debug, Error)]
#[error("worker task panicked: {message}")]
pub struct TaskPanic {
    pub message: String,
}

/// Outcome of one item as delivered to the caller.
pub type TaskResult<R> = Result<R, TaskPanic>;

struct Queue<T> {
    items: VecDeque<T>,
    in_flight: usize,
    closed: bool,
}

struct Shared<T> {
    queue: Mutex<Queue<T>>,
    /// Signalled when an item is queued or the pool closes.
    available: Condvar,
    /// Signalled when a worker finishes an item.
    idle: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Queue<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct WorkerPool<T, R> {
    shared: Arc<Shared<T>>,
    results: Receiver<TaskResult<R>>,
    workers: Vec<JoinHandle<()>>,
}

impl<T, R> WorkerPool<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Spawns `size` workers (at least one) named `{name}-{i}`, each running
    /// `handler` on queued items until the pool is closed.
    pub fn start<F>(size: usize, name: &str, handler: F) -> io::Result<Self>
    where
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let size = size.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                items: VecDeque::new(),
                in_flight: 0,
                closed: false,
            }),
            available: Condvar::new(),
            idle: Condvar::new(),
        });
        let (tx, rx) = mpsc::channel();
        let handler = Arc::new(handler);
        let mut pool = WorkerPool {
            shared,
            results: rx,
            workers: Vec::with_capacity(size),
        };
        for i in 0..size {
            let shared = Arc::clone(&pool.shared);
            let handler = Arc::clone(&handler);
            let tx = tx.clone();
            // On error `pool` is dropped here, which closes and joins the
            // workers already spawned.
            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, i))
                .spawn(move || worker_loop(&shared, handler.as_ref(), &tx))?;
            pool.workers.push(handle);
        }
        tracing::debug!(workers = size, name, "worker pool started");
        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queues an item. Returns false if the pool is closed.
    pub fn submit(&self, item: T) -> bool {
        let mut q = self.shared.lock();
        if q.closed {
            return false;
        }
        q.items.push_back(item);
        drop(q);
        self.shared.available.notify_one();
        true
    }

    /// Next finished item, waiting at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<TaskResult<R>, RecvTimeoutError> {
        self.results.recv_timeout(timeout)
    }

    /// Queued plus running items.
    pub fn pending(&self) -> usize {
        let q = self.shared.lock();
        q.items.len() + q.in_flight
    }

    /// Drops every queued item that no worker has picked up yet and returns
    /// how many were dropped. Running items are unaffected.
    pub fn clear(&self) -> usize {
        let mut q = self.shared.lock();
        let n = q.items.len();
        q.items.clear();
        drop(q);
        self.shared.idle.notify_all();
        n
    }

    /// Blocks until the queue is empty and no worker is mid-task. Items
    /// resubmitted while waiting are waited for too. Every outcome of the
    /// drained items is in the result channel when this returns.
    pub fn drain(&self) {
        let mut q = self.shared.lock();
        while !q.items.is_empty() || q.in_flight > 0 {
            q = self
                .shared
                .idle
                .wait(q)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Stops accepting work. Workers finish the items already queued, then exit.
    pub fn close(&self) {
        let mut q = self.shared.lock();
        q.closed = true;
        drop(q);
        self.shared.available.notify_all();
    }

    /// Closes the pool and waits for every worker to exit. Returns the
    /// outcomes that were still unread.
    pub fn join(mut self) -> Vec<TaskResult<R>> {
        self.shutdown();
        self.results.try_iter().collect()
    }

    fn shutdown(&mut self) {
        self.close();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("worker thread exited abnormally");
            }
        }
    }
}

impl<T, R> Drop for WorkerPool<T, R> {
    fn drop(&mut self) {
        {
            let mut q = self.shared.lock();
            q.closed = true;
        }
        self.shared.available.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop<T, R, F>(shared: &Shared<T>, handler: &F, tx: &Sender<TaskResult<R>>)
where
    F: Fn(T) -> R,
{
    loop {
        let item = {
            let mut q = shared.lock();
            loop {
                if let Some(item) = q.items.pop_front() {
                    q.in_flight += 1;
                    break item;
                }
                if q.closed {
                    return;
                }
                q = shared
                    .available
                    .wait(q)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(item))).map_err(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            TaskPanic { message }
        });
        // Receiver gone means the caller stopped listening; keep draining the
        // queue so `drain` still returns.
        let _ = tx.send(outcome);

        let mut q = shared.lock();
        q.in_flight -= 1;
        drop(q);
        shared.idle.notify_all();
    }
}
