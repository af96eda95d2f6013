//! Process-wide rotator registry
//!
//! One live rotator per logical name. The process-wide instance backs
//! [`Rotator::open`](crate::Rotator::open); tests and embedders can run
//! their own registry to keep name spaces isolated.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::rotator::Rotator;

static GLOBAL: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));

/// Maps logical names to live rotator instances.
///
/// The map's lock is independent of any rotator's own lock, so lookups
/// under one name never contend with rotations under another.
pub struct Registry {
    inner: Mutex<HashMap<String, Arc<Rotator>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide registry.
    pub fn global() -> Arc<Registry> {
        GLOBAL.clone()
    }

    /// Whether a rotator is currently registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.lock().contains_key(name)
    }

    /// Inserts `candidate` under `name` unless the slot is already taken;
    /// returns the occupant and whether `candidate` was inserted.
    pub(crate) fn get_or_insert(
        &self,
        name: &str,
        candidate: &Arc<Rotator>,
    ) -> (Arc<Rotator>, bool) {
        let mut map = self.inner.lock();
        match map.get(name) {
            Some(existing) => (existing.clone(), false),
            None => {
                map.insert(name.to_string(), candidate.clone());
                (candidate.clone(), true)
            }
        }
    }

    /// Removes `name`, but only while it still maps to `instance`. A stale
    /// close never unseats a fresh rotator that reclaimed the name.
    pub(crate) fn remove_if(&self, name: &str, instance: &Arc<Rotator>) {
        let mut map = self.inner.lock();
        if map.get(name).is_some_and(|current| Arc::ptr_eq(current, instance)) {
            map.remove(name);
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.inner.lock().keys().cloned().collect();
        f.debug_struct("Registry").field("names", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_global_registry_is_shared() {
        assert!(Arc::ptr_eq(&Registry::global(), &Registry::global()));
    }

    #[test]
    fn test_concurrent_opens_share_one_instance() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        let config = Config::new().with_folder(dir.path()).with_name("racer");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let config = config.clone();
                thread::spawn(move || Rotator::open_with(registry, config).unwrap())
            })
            .collect();
        let rotators: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for rotator in &rotators[1..] {
            assert!(Arc::ptr_eq(&rotators[0], rotator));
        }
        rotators[0].close().unwrap();
    }

    #[test]
    fn test_contains_tracks_lifecycle() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        let config = Config::new().with_folder(dir.path()).with_name("lifecycle");

        let rotator = Rotator::open_with(registry.clone(), config.clone()).unwrap();
        assert!(registry.contains("lifecycle"));

        rotator.close().unwrap();
        assert!(!registry.contains("lifecycle"));

        // The name is free again; a new open gets a fresh instance.
        let reopened = Rotator::open_with(registry.clone(), config).unwrap();
        assert!(registry.contains("lifecycle"));
        assert!(!Arc::ptr_eq(&rotator, &reopened));
        reopened.close().unwrap();
    }
}
