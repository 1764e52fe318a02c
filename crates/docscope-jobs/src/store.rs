//! In-memory job store.
//!
//! Records live in a fixed number of shards keyed by job id. Each record has
//! its own lock, so a status read always sees progress and logs from the same
//! update. Completion is signalled once per job over a watch channel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock};

use docscope_core::defaults::JOB_STORE_SHARDS;
use docscope_core::{Error, JobId, Result};

use crate::job::JobRecord;

/// One stored job: its record plus a completion signal.
#[derive(Debug)]
pub struct StoredJob {
    record: Mutex<JobRecord>,
    terminal: watch::Sender<bool>,
}

impl StoredJob {
    fn new(record: JobRecord) -> Self {
        let done = record.status().is_terminal();
        let (terminal, _) = watch::channel(done);
        Self {
            record: Mutex::new(record),
            terminal,
        }
    }

    /// Read the record under its lock.
    pub async fn read<R>(&self, f: impl FnOnce(&JobRecord) -> R) -> R {
        let record = self.record.lock().await;
        f(&record)
    }

    /// Mutate the record under its lock, signalling completion if the update
    /// made it terminal.
    pub async fn update<R>(&self, f: impl FnOnce(&mut JobRecord) -> R) -> R {
        let mut record = self.record.lock().await;
        let out = f(&mut record);
        if record.status().is_terminal() {
            self.terminal.send_replace(true);
        }
        out
    }

    /// Resolve once the job is completed or failed.
    pub async fn wait_terminal(&self) {
        let mut rx = self.terminal.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx.wait_for(|done| *done).await;
    }
}

/// Sharded map of job id to [`StoredJob`].
#[derive(Debug)]
pub struct JobStore {
    shards: Vec<RwLock<HashMap<JobId, Arc<StoredJob>>>>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self::with_shards(JOB_STORE_SHARDS)
    }

    pub fn with_shards(count: usize) -> Self {
        let count = count.max(1);
        Self {
            shards: (0..count).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, id: &JobId) -> &RwLock<HashMap<JobId, Arc<StoredJob>>> {
        let index = (id.as_u128() % self.shards.len() as u128) as usize;
        &self.shards[index]
    }

    pub async fn insert(&self, record: JobRecord) -> Arc<StoredJob> {
        let id = record.id();
        let job = Arc::new(StoredJob::new(record));
        self.shard(&id).write().await.insert(id, job.clone());
        job
    }

    pub async fn get(&self, id: JobId) -> Result<Arc<StoredJob>> {
        self.shard(&id)
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(Error::JobNotFound(id))
    }

    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.read().await.len();
        }
        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
