//! Process-wide holder for the loaded classifier
//!
//! The classifier is loaded at most once and never replaced. Readers go
//! through the `OnceLock` without locking; only the first load takes the
//! init mutex.

use super::{load_classifier, Classifier, ModelSettings};
use crate::error::{PredictError, Result};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;

/// Global classifier instance (loaded once)
static GLOBAL_CLASSIFIER: OnceLock<ClassifierCache> = OnceLock::new();

/// Immutable-after-init classifier slot
#[derive(Default)]
pub struct ClassifierCache {
    slot: OnceLock<Arc<dyn Classifier>>,
    init: Mutex<()>,
}

impl ClassifierCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache
    pub fn global() -> &'static ClassifierCache {
        GLOBAL_CLASSIFIER.get_or_init(ClassifierCache::new)
    }

    /// The cached classifier, if one has been loaded
    pub fn get(&self) -> Option<Arc<dyn Classifier>> {
        self.slot.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Return the cached classifier, loading it from `settings` on first use
    ///
    /// Once a classifier is cached, later calls return it regardless of
    /// `settings`. A failed load leaves the cache empty.
    pub fn get_or_load(&self, settings: &ModelSettings) -> Result<Arc<dyn Classifier>> {
        self.get_or_try_init(|| load_classifier(settings))
    }

    /// Check-then-load with a double check under the init mutex
    pub fn get_or_try_init<F>(&self, load: F) -> Result<Arc<dyn Classifier>>
    where
        F: FnOnce() -> Result<Arc<dyn Classifier>>,
    {
        if let Some(classifier) = self.slot.get() {
            return Ok(classifier.clone());
        }

        let _guard = self.init.lock().map_err(|e| PredictError::ModelUnavailable {
            path: Default::default(),
            reason: format!("classifier init lock poisoned: {}", e),
        })?;

        if let Some(classifier) = self.slot.get() {
            return Ok(classifier.clone());
        }

        let classifier = load()?;
        debug!(version = %classifier.version(), "Classifier cached");
        Ok(self.slot.get_or_init(|| classifier).clone())
    }
}
