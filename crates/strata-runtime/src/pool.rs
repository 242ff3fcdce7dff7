use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Background workers whose results come back in completion order.
pub struct JobPool<R> {
    pool: ThreadPool,
    tx: Sender<(u64, R)>,
    rx: Receiver<(u64, R)>,
    next_id: AtomicU64,
    inflight: Arc<AtomicUsize>,
}

impl<R: Send + 'static> JobPool<R> {
    pub fn new(name: &str, workers: usize) -> Result<Self, ThreadPoolBuildError> {
        let prefix = name.to_string();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()?;
        let (tx, rx) = unbounded();
        Ok(Self {
            pool,
            tx,
            rx,
            next_id: AtomicU64::new(1),
            inflight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Queues `job`; its result is tagged with the returned id.
    pub fn submit<F>(&self, job: F) -> u64
    where
        F: FnOnce() -> R + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tx = self.tx.clone();
        let inflight = self.inflight.clone();
        inflight.fetch_add(1, Ordering::Relaxed);
        self.pool.spawn(move || {
            let out = job();
            inflight.fetch_sub(1, Ordering::Relaxed);
            // Receiver lives as long as the pool; a send error means shutdown.
            let _ = tx.send((id, out));
        });
        id
    }

    /// Finished results, never blocking.
    pub fn drain(&self) -> Vec<(u64, R)> {
        self.rx.try_iter().collect()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<(u64, R)> {
        match self.rx.recv_timeout(timeout) {
            Ok(r) => Some(r),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Jobs submitted but not yet finished.
    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Relaxed)
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;

    #[test]
    fn results_carry_their_job_ids() {
        let pool = JobPool::new("test-pool", 3).unwrap();
        let ids: Vec<u64> = (0..16u64).map(|n| pool.submit(move || n * n)).collect();
        let mut seen = HashSet::new();
        while seen.len() < ids.len() {
            let (id, value) = pool
                .recv_timeout(Duration::from_secs(5))
                .expect("job result");
            let n = ids.iter().position(|&i| i == id).unwrap() as u64;
            assert_eq!(value, n * n);
            seen.insert(id);
        }
        assert!(pool.drain().is_empty());
        assert_eq!(pool.inflight(), 0);
    }
}
