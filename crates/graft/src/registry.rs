//! Process-wide bookkeeping of load outcomes.
//!
//! A [`Registry`] is an explicit value: create one per process (or per test),
//! share it by reference, and call [`Registry::reset`] to tear it down. Each
//! grammar name moves through `Unloaded -> Loaded` or `Unloaded -> Failed`
//! exactly once; both outcomes stick until the entry is removed.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::artifact::GrammarArtifact;
use crate::error::LoadError;
use crate::loader::{LanguageHandle, Loader};

/// Where a grammar stands in the registry.
#[derive(Debug, Clone)]
pub enum LoadState {
    /// No load has been attempted.
    Unloaded,
    /// The grammar loaded; the handle is shared.
    Loaded(Arc<LanguageHandle>),
    /// The load failed; the error is replayed to later callers.
    Failed(LoadError),
}

impl LoadState {
    /// Returns `true` once a load has been attempted.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unloaded)
    }
}

/// Load outcomes keyed by grammar name.
#[derive(Debug, Default)]
pub struct Registry {
    loader: Loader,
    entries: Mutex<HashMap<String, LoadState>>,
}

impl Registry {
    /// An empty registry using the default [`Loader`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty registry using `loader` for every load.
    #[must_use]
    pub fn with_loader(loader: Loader) -> Self {
        Self {
            loader,
            entries: Mutex::default(),
        }
    }

    /// Loads `artifact` once and returns the recorded outcome on every later call.
    ///
    /// The registry lock is held across the load, so concurrent loads are
    /// serialized and the underlying loader never runs twice for one name.
    ///
    /// # Errors
    ///
    /// Returns the [`LoadError`] of the first attempt for this grammar name.
    pub fn load(&self, artifact: &GrammarArtifact) -> Result<Arc<LanguageHandle>, LoadError> {
        let mut entries = self.entries.lock();
        match entries.get(artifact.name()) {
            Some(LoadState::Loaded(handle)) => return Ok(Arc::clone(handle)),
            Some(LoadState::Failed(err)) => return Err(err.clone()),
            Some(LoadState::Unloaded) | None => {}
        }

        let outcome = self.loader.load_and_validate(artifact).map(Arc::new);
        let state = match &outcome {
            Ok(handle) => LoadState::Loaded(Arc::clone(handle)),
            Err(err) => {
                warn!(grammar = artifact.name(), kind = %err.kind(), "grammar failed to load");
                LoadState::Failed(err.clone())
            }
        };
        entries.insert(artifact.name().to_owned(), state);
        outcome
    }

    /// The current state of grammar `name`.
    #[must_use]
    pub fn state(&self, name: &str) -> LoadState {
        self.entries
            .lock()
            .get(name)
            .cloned()
            .unwrap_or(LoadState::Unloaded)
    }

    /// Forgets grammar `name`, returning its previous state.
    ///
    /// The handle is released once no caller holds it any longer.
    pub fn unload(&self, name: &str) -> LoadState {
        self.entries
            .lock()
            .remove(name)
            .unwrap_or(LoadState::Unloaded)
    }

    /// Forgets every grammar. Call between test runs to start from a clean state.
    pub fn reset(&self) {
        let mut entries = self.entries.lock();
        debug!(entries = entries.len(), "resetting grammar registry");
        entries.clear();
    }

    /// Number of grammars with a recorded outcome.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no outcome has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Metadata;
    use crate::error::LoadErrorKind;

    fn json_artifact() -> GrammarArtifact {
        GrammarArtifact::builtin("json", tree_sitter_json::LANGUAGE)
    }

    #[test]
    fn test_repeated_loads_share_one_handle() {
        let registry = Registry::new();
        let first = registry.load(&json_artifact()).unwrap();
        let second = registry.load(&json_artifact()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(matches!(registry.state("json"), LoadState::Loaded(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_failure_is_terminal_until_reset() {
        let registry = Registry::new();
        let broken =
            json_artifact().with_parser_source(Metadata::inline("#define LANGUAGE_VERSION 1\n"));

        let err = registry.load(&broken).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::AbiMismatch);

        // Same name, fixed artifact: the recorded failure still wins.
        let replayed = registry.load(&json_artifact()).unwrap_err();
        assert_eq!(replayed, err);
        assert!(registry.state("json").is_terminal());

        registry.reset();
        assert!(registry.is_empty());
        assert!(!registry.state("json").is_terminal());
        assert!(registry.load(&json_artifact()).is_ok());
    }

    #[test]
    fn test_unload_returns_previous_state() {
        let registry = Registry::new();
        registry.load(&json_artifact()).unwrap();
        assert!(matches!(registry.unload("json"), LoadState::Loaded(_)));
        assert!(matches!(registry.unload("json"), LoadState::Unloaded));
    }

    #[test]
    fn test_concurrent_loads_are_serialized() {
        let registry = Registry::new();
        let handles: Vec<_> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| registry.load(&json_artifact()).unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        assert!(handles.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }
}
