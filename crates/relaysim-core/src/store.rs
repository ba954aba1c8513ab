use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use relaysim_runner::ScenarioResult;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunStoreError {
    #[error("Run not found: {run_id}")]
    NotFound { run_id: String },

    #[error("Run already stored: {run_id}")]
    Duplicate { run_id: String },
}

#[derive(Default)]
struct Runs {
    by_id: HashMap<String, ScenarioResult>,
    order: Vec<String>,
}

/// Finished scenario results keyed by run id, kept in insertion order.
pub struct RunStore {
    runs: Mutex<Runs>,
}

impl RunStore {
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(Runs::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Runs> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `result` and return its run id.
    pub fn insert(&self, result: ScenarioResult) -> Result<String, RunStoreError> {
        let run_id = result.run_id().to_string();
        let mut runs = self.lock();
        if runs.by_id.contains_key(&run_id) {
            return Err(RunStoreError::Duplicate { run_id });
        }
        runs.order.push(run_id.clone());
        runs.by_id.insert(run_id.clone(), result);
        Ok(run_id)
    }

    /// Get a clone of a stored result.
    pub fn get(&self, run_id: &str) -> Option<ScenarioResult> {
        self.lock().by_id.get(run_id).cloned()
    }

    /// All stored results, oldest first.
    pub fn list(&self) -> Vec<ScenarioResult> {
        let runs = self.lock();
        runs.order
            .iter()
            .filter_map(|id| runs.by_id.get(id).cloned())
            .collect()
    }

    pub fn remove(&self, run_id: &str) -> Result<ScenarioResult, RunStoreError> {
        let mut runs = self.lock();
        let result = runs
            .by_id
            .remove(run_id)
            .ok_or_else(|| RunStoreError::NotFound {
                run_id: run_id.to_string(),
            })?;
        runs.order.retain(|id| id != run_id);
        Ok(result)
    }

    /// Drop every run, returning how many were stored.
    pub fn clear(&self) -> usize {
        let mut runs = self.lock();
        let count = runs.by_id.len();
        runs.by_id.clear();
        runs.order.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RunStore {
    fn default() -> Self {
        Self::new()
    }
}
