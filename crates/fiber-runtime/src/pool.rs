//! `WorkerPool`: fixed set of OS threads for blocking or CPU-heavy jobs.
//!
//! Fibers hand jobs over with `submit()`; the job reports back through the
//! reactor's channel, never by touching reactor state. Workers park when
//! the queue is empty and are unparked on submit.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_queue::ArrayQueue;
use fiber_core::kerror;

use crate::error::{FiberError, FiberResult};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

const PARK_TIMEOUT: Duration = Duration::from_millis(50);

struct PoolInner {
    queue: ArrayQueue<Job>,
    /// Workers currently running a job
    active: AtomicUsize,
    shutdown: AtomicBool,
}

pub struct WorkerPool {
    inner: Arc<PoolInner>,
    handles: Vec<thread::JoinHandle<()>>,
    next: AtomicUsize,
}

impl WorkerPool {
    /// Spawn `n` workers sharing a queue of `queue_depth` jobs.
    pub fn new(n: usize, queue_depth: usize) -> FiberResult<Self> {
        let inner = Arc::new(PoolInner {
            queue: ArrayQueue::new(queue_depth.max(1)),
            active: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
        });

        let mut pool = WorkerPool {
            inner,
            handles: Vec::with_capacity(n),
            next: AtomicUsize::new(0),
        };
        for worker_id in 0..n.max(1) {
            let inner = Arc::clone(&pool.inner);
            let handle = thread::Builder::new()
                .name(format!("fiber-pool-{}", worker_id))
                .spawn(move || worker_loop(inner))
                .map_err(|e| FiberError::Os(e.raw_os_error().unwrap_or(libc::EAGAIN)))?;
            pool.handles.push(handle);
        }
        Ok(pool)
    }

    /// Queue a job. Fails when shut down or when the queue is full.
    pub fn submit(&self, job: Job) -> FiberResult<()> {
        if self.inner.shutdown.load(Ordering::Relaxed) {
            return Err(FiberError::PoolUnavailable);
        }
        self.inner.queue.push(job).map_err(|_| FiberError::PoolUnavailable)?;

        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.handles.len();
        self.handles[i].thread().unpark();
        Ok(())
    }

    pub fn active_workers(&self) -> usize {
        self.inner.active.load(Ordering::Relaxed)
    }

    pub fn total_workers(&self) -> usize {
        self.handles.len()
    }

    pub fn queued(&self) -> usize {
        self.inner.queue.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        for handle in &self.handles {
            handle.thread().unpark();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(inner: Arc<PoolInner>) {
    loop {
        match inner.queue.pop() {
            Some(job) => {
                inner.active.fetch_add(1, Ordering::Relaxed);
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    kerror!("pool job panicked");
                }
                inner.active.fetch_sub(1, Ordering::Relaxed);
            }
            None => {
                if inner.shutdown.load(Ordering::Relaxed) {
                    break;
                }
                thread::park_timeout(PARK_TIMEOUT);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_jobs_run() {
        let pool = WorkerPool::new(2, 16).unwrap();
        let (tx, rx) = mpsc::channel();
        for i in 0..10 {
            let tx = tx.clone();
            pool.submit(Box::new(move || tx.send(i).unwrap())).unwrap();
        }
        let mut got: Vec<i32> = (0..10).map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap()).collect();
        got.sort();
        assert_eq!(got, (0..10).collect::<Vec<_>>());
        assert_eq!(pool.total_workers(), 2);
    }

    #[test]
    fn test_full_queue_rejected() {
        let pool = WorkerPool::new(1, 1).unwrap();
        let (block_tx, block_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();

        // Occupy the only worker
        pool.submit(Box::new(move || {
            started_tx.send(()).unwrap();
            let _ = block_rx.recv();
        }))
        .unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        pool.submit(Box::new(|| {})).unwrap();
        assert_eq!(pool.submit(Box::new(|| {})), Err(FiberError::PoolUnavailable));
        drop(block_tx);
    }

    #[test]
    fn test_panicking_job_keeps_worker() {
        let pool = WorkerPool::new(1, 4).unwrap();
        pool.submit(Box::new(|| panic!("job failure"))).unwrap();
        let (tx, rx) = mpsc::channel();
        pool.submit(Box::new(move || tx.send(7).unwrap())).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
    }
}
