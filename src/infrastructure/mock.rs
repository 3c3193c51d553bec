use crate::domain::errors::ModelStoreError;
use crate::domain::ml::ModelState;
use crate::domain::ports::{ModelStore, SeriesSource};
use anyhow::Result;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Model store kept in memory, with switchable write failures.
#[derive(Default)]
pub struct InMemoryModelStore {
    state: RwLock<Option<ModelState>>,
    fail_writes: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: ModelState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
            ..Self::default()
        }
    }

    /// Makes every following `save` fail until switched off again
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Option<ModelState> {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ModelStore for InMemoryModelStore {
    fn load(&self) -> Option<ModelState> {
        self.stored()
    }

    fn save(&self, state: &ModelState) -> Result<(), ModelStoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ModelStoreError::Unavailable {
                reason: "simulated write failure".to_string(),
            });
        }

        match self.state.write() {
            Ok(mut guard) => *guard = Some(state.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(state.clone()),
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Series held in memory; tests grow it between requests.
#[derive(Default)]
pub struct StaticSeriesSource {
    values: RwLock<Vec<f64>>,
}

impl StaticSeriesSource {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    pub fn extend(&self, more: &[f64]) {
        match self.values.write() {
            Ok(mut guard) => guard.extend_from_slice(more),
            Err(poisoned) => poisoned.into_inner().extend_from_slice(more),
        }
    }
}

impl SeriesSource for StaticSeriesSource {
    fn load_series(&self) -> Result<Vec<f64>> {
        match self.values.read() {
            Ok(guard) => Ok(guard.clone()),
            Err(poisoned) => Ok(poisoned.into_inner().clone()),
        }
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
