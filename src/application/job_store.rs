//! In-memory registry of update-job runs
//!
//! One coarse lock guards the map. A run is only mutated by its own worker
//! after registration, so readers just need a consistent clone.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::Run;

#[derive(Clone, Default)]
pub struct JobStore {
    runs: Arc<RwLock<HashMap<String, Run>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, run: Run) {
        self.runs.write().await.insert(run.job_id.clone(), run);
    }

    /// Snapshot of the run's current state
    pub async fn get(&self, job_id: &str) -> Option<Run> {
        self.runs.read().await.get(job_id).cloned()
    }

    /// Apply `mutate` to a registered run and return its new state
    pub async fn update<F>(&self, job_id: &str, mutate: F) -> Option<Run>
    where
        F: FnOnce(&mut Run),
    {
        let mut runs = self.runs.write().await;
        let run = runs.get_mut(job_id)?;
        mutate(run);
        Some(run.clone())
    }
}
