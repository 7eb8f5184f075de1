//! The connection set and its reaper.
//!
//! Every accepted session is enlisted into a mutex-guarded set of
//! workers. A background reaper periodically removes workers that reached
//! a terminal state, joining their threads; shutdown requests a stop on
//! every worker and then drains them all.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use dotchat_common::Transport;

use crate::store::Store;
use crate::worker::{Worker, WorkerState};

/// How often the reaper sweeps the set.
pub const REAP_INTERVAL: Duration = Duration::from_millis(100);

/// Owner of all live connection workers.
pub struct ConnectionManager {
    workers: Arc<Mutex<Vec<Worker>>>,
    reaper_stop: Arc<AtomicBool>,
    reaper: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::with_reap_interval(REAP_INTERVAL)
    }

    pub fn with_reap_interval(interval: Duration) -> Self {
        let workers = Arc::new(Mutex::new(Vec::new()));
        let reaper_stop = Arc::new(AtomicBool::new(false));

        let reaper = {
            let workers = Arc::clone(&workers);
            let stop = Arc::clone(&reaper_stop);
            thread::Builder::new()
                .name("reaper".into())
                .spawn(move || reap_loop(&workers, &stop, interval))
                .expect("failed to start reaper thread")
        };

        Self {
            workers,
            reaper_stop,
            reaper: Some(reaper),
        }
    }

    /// Construct and enlist a worker for `transport`; its thread starts
    /// immediately.
    pub fn enlist<T: Transport + 'static>(
        &self,
        transport: T,
        store: Arc<Store>,
    ) -> std::io::Result<u64> {
        let mut set = self.workers.lock();
        let worker = Worker::spawn(transport, store)?;
        let id = worker.id();
        set.push(worker);
        Ok(id)
    }

    /// Number of workers currently in the set, reaped or not.
    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Snapshot of `(id, state)` for every worker in the set.
    pub fn states(&self) -> Vec<(u64, WorkerState)> {
        self.workers
            .lock()
            .iter()
            .map(|w| (w.id(), w.state()))
            .collect()
    }

    /// Stop the reaper, request a stop on every worker, and join them all.
    /// No worker is abandoned.
    pub fn shutdown_all(mut self) {
        self.stop_reaper();

        let mut set = self.workers.lock();
        for worker in set.iter() {
            worker.request_stop();
        }
        debug!(workers = set.len(), "draining connection workers");
        for worker in set.iter_mut() {
            worker.join();
        }
        set.clear();
    }

    fn stop_reaper(&mut self) {
        self.reaper_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reaper.take() {
            let _ = handle.join();
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.stop_reaper();
    }
}

fn reap_loop(workers: &Mutex<Vec<Worker>>, stop: &AtomicBool, interval: Duration) {
    while !stop.load(Ordering::SeqCst) {
        thread::sleep(interval);
        let mut set = workers.lock();
        set.retain_mut(|worker| {
            if worker.is_terminated() {
                worker.join();
                trace!(worker = worker.id(), "reaped terminated worker");
                false
            } else {
                true
            }
        });
    }
}
