//! Background writer with deferred cache commits.
//!
//! The simulation thread queues a store write together with the cache update
//! that should follow it. A single worker task runs the writes in order on the
//! blocking pool and hands each cache update back over a channel; the owner
//! applies them with [`WriteBehind::pump`] or [`WriteBehind::settle`]. A
//! failed write is logged and its commit is still delivered.

use std::sync::Arc;

use log::{error, trace, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::claims::cache::Caches;
use crate::claims::errors::ClaimError;
use crate::claims::storage::ClaimStore;

/// Cache mutation to run on the simulation thread once a write finished.
pub type CacheCommit = Box<dyn FnOnce(&mut Caches) + Send + 'static>;

type Job = Box<dyn FnOnce(&dyn ClaimStore) -> CacheCommit + Send + 'static>;

pub struct WriteBehind {
    jobs: mpsc::UnboundedSender<Job>,
    commits: mpsc::UnboundedReceiver<CacheCommit>,
    pending: usize,
}

impl WriteBehind {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(store: Arc<dyn ClaimStore>) -> Result<Self, ClaimError> {
        let handle = Handle::try_current().map_err(|_| ClaimError::NoRuntime)?;
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (commits_tx, commits_rx) = mpsc::unbounded_channel();
        handle.spawn(run_worker(store, jobs_rx, commits_tx));
        Ok(Self {
            jobs: jobs_tx,
            commits: commits_rx,
            pending: 0,
        })
    }

    /// Queue `write`; `commit` is applied to the caches after it completes,
    /// whether or not the write succeeded.
    pub fn dispatch<W, C>(&mut self, label: &'static str, write: W, commit: C)
    where
        W: FnOnce(&dyn ClaimStore) -> Result<(), ClaimError> + Send + 'static,
        C: FnOnce(&mut Caches) + Send + 'static,
    {
        let job: Job = Box::new(move |store: &dyn ClaimStore| {
            if let Err(e) = write(store) {
                warn!("background {label} failed, keeping in-memory state: {e}");
            } else {
                trace!("background {label} persisted");
            }
            Box::new(commit) as CacheCommit
        });
        match self.jobs.send(job) {
            Ok(()) => self.pending += 1,
            Err(_) => error!("persistence worker is gone; dropping {label}"),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Apply every commit that is ready without waiting.
    pub fn pump(&mut self, caches: &mut Caches) -> usize {
        let mut applied = 0;
        while let Ok(commit) = self.commits.try_recv() {
            commit(caches);
            self.pending = self.pending.saturating_sub(1);
            applied += 1;
        }
        applied
    }

    /// Wait until every dispatched write has been committed.
    pub async fn settle(&mut self, caches: &mut Caches) {
        while self.pending > 0 {
            match self.commits.recv().await {
                Some(commit) => {
                    commit(caches);
                    self.pending -= 1;
                }
                None => {
                    error!(
                        "persistence worker stopped with {} writes outstanding",
                        self.pending
                    );
                    self.pending = 0;
                }
            }
        }
    }
}

async fn run_worker(
    store: Arc<dyn ClaimStore>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    commits: mpsc::UnboundedSender<CacheCommit>,
) {
    while let Some(job) = jobs.recv().await {
        let store = Arc::clone(&store);
        let commit = match tokio::task::spawn_blocking(move || job(store.as_ref())).await {
            Ok(commit) => commit,
            Err(e) => {
                error!("persistence task aborted: {e}");
                Box::new(|_: &mut Caches| {}) as CacheCommit
            }
        };
        if commits.send(commit).is_err() {
            break;
        }
    }
    trace!("persistence worker exiting");
}
