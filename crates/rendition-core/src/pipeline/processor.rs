//! Pipeline orchestration - runs a job through load, fan-out and persistence.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::ProcessorConfig;
use crate::error::{ProcessingError, Result};
use crate::store::BlobStore;
use crate::types::{Processed, ProcessingStats};

use super::job::{Codecs, Job, Recovery};
use super::persist::save_blobs;
use super::pool::WorkerPool;

/// Where a job is in its lifecycle. `Failed` is reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Init,
    Loading,
    FanningOut,
    Joined,
    Persisting,
    Done,
    Failed,
}

/// Turns raw image bytes into renditions, optionally storing them.
///
/// A processor holds one transform pool shared by every job it runs.
pub struct Processor {
    config: ProcessorConfig,
    pool: WorkerPool,
    store: Option<Arc<dyn BlobStore>>,
    codecs: Codecs,
}

impl Processor {
    /// Create a processor with a pool sized from `config.pool_size`.
    pub fn new(config: ProcessorConfig) -> Self {
        let pool = WorkerPool::new(config.pool_size);
        Self {
            config,
            pool,
            store: None,
            codecs: Codecs::default(),
        }
    }

    /// Attach the blob store used when `save` and `save_blob` are set.
    pub fn with_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_codecs(mut self, codecs: Codecs) -> Self {
        self.codecs = codecs;
        self
    }

    /// Share an existing pool instead of the one built from the config.
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Read a stream to the end and process it.
    pub async fn process_stream<R>(&self, mut reader: R) -> Result<Processed>
    where
        R: AsyncRead + Unpin,
    {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw).await?;
        self.process(raw).await
    }

    /// Process one image. Either every configured size is produced or the
    /// whole job fails.
    pub async fn process(&self, raw: Vec<u8>) -> Result<Processed> {
        let mut state = JobState::Init;
        let result = self.run(raw, &mut state).await;
        if let Err(e) = &result {
            tracing::debug!("Job failed while {:?}: {e}", state);
            advance(&mut state, JobState::Failed);
        }
        result
    }

    async fn run(&self, raw: Vec<u8>, state: &mut JobState) -> Result<Processed> {
        let start = Instant::now();
        let persist = self.config.persists_blobs();
        let store = match (&self.store, persist) {
            (Some(store), true) => Some(store.clone()),
            (None, true) => return Err(ProcessingError::NoBlobStore.into()),
            _ => None,
        };

        let mut stats = ProcessingStats {
            original_size: raw.len(),
            ..Default::default()
        };
        let job = Job::new(&self.config, raw, self.codecs.clone())?;

        advance(state, JobState::Loading);
        let load_start = Instant::now();
        let (job, loaded) = self
            .pool
            .run(move || {
                let mut job = job;
                let loaded = job.load();
                (job, loaded)
            })
            .await?;
        let shared = loaded?;
        stats.load = load_start.elapsed();
        if job.recovery() == Recovery::Recovered {
            stats.recovered_size = Some(job.raw().len());
        }

        advance(state, JobState::FanningOut);
        let mut batch = self.pool.batch();
        for task in job.transform_tasks(shared) {
            batch.start(move || task.run());
        }
        let renditions = batch.wait_all().await?;

        advance(state, JobState::Joined);
        let mut results = BTreeMap::new();
        for rendition in renditions {
            let rendition = rendition?;
            stats
                .renditions
                .insert(rendition.name.clone(), rendition.timings);
            results.insert(rendition.name, rendition.bytes);
        }

        let checksum = job.checksum().clone();
        let mut info = job.into_info();

        if let Some(store) = store {
            advance(state, JobState::Persisting);
            let persist_start = Instant::now();
            save_blobs(
                store,
                &checksum,
                &mut info,
                &results,
                Duration::from_secs(self.config.ttl),
            )
            .await?;
            stats.persist = Some(persist_start.elapsed());
        }

        advance(state, JobState::Done);
        stats.total = start.elapsed();
        tracing::debug!(
            "Processed {} in {:?} ({} renditions, load {:?})",
            checksum.storage_key(),
            stats.total,
            results.len(),
            stats.load
        );

        Ok(Processed {
            results,
            info,
            checksum,
            stats,
        })
    }
}

fn advance(state: &mut JobState, next: JobState) {
    tracing::trace!("Job state: {:?} -> {:?}", state, next);
    *state = next;
}
