//! Registry of generated paths

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use indexmap::IndexMap;
use std::sync::Arc;

// Internal
use crate::path_gen::TrajectoryPair;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Ordered mapping from path id to trajectory.
///
/// Ids are kept in the order they were first inserted. Replacing the
/// trajectory of an existing id keeps its position.
///
/// Trajectories are shared with the execution engine, so replacing or removing
/// an entry never invalidates a path that is currently being driven.
#[derive(Debug, Default)]
pub struct PathRegistry {
    paths: IndexMap<String, Arc<TrajectoryPair>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new path or replace the trajectory of an existing one.
    ///
    /// Empty trajectories are never registered, in which case `false` is
    /// returned and the registry is unchanged.
    pub fn insert_or_replace(&mut self, id: &str, path: TrajectoryPair) -> bool {
        if path.is_empty() {
            return false;
        }

        let path = Arc::new(path);

        match self.paths.get_mut(id) {
            Some(existing) => *existing = path,
            None => {
                self.paths.insert(id.to_string(), path);
            }
        }

        true
    }

    /// Remove a path, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<Arc<TrajectoryPair>> {
        self.paths.shift_remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<TrajectoryPair>> {
        self.paths.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.paths.contains_key(id)
    }

    /// All registered ids in order.
    pub fn ids(&self) -> Vec<String> {
        self.paths.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::path_gen::TrajectorySegment;

    fn pair(num_samples: usize, vel_ms: f64) -> TrajectoryPair {
        let segs = vec![TrajectorySegment::new(0.0, vel_ms, 0.0); num_samples];
        TrajectoryPair::new(segs.clone(), segs).unwrap()
    }

    #[test]
    fn test_insertion_order() {
        let mut reg = PathRegistry::new();

        assert!(reg.insert_or_replace("c", pair(1, 0.1)));
        assert!(reg.insert_or_replace("a", pair(2, 0.2)));
        assert!(reg.insert_or_replace("b", pair(3, 0.3)));

        assert_eq!(reg.ids(), vec!["c", "a", "b"]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut reg = PathRegistry::new();
        reg.insert_or_replace("first", pair(1, 0.1));
        reg.insert_or_replace("second", pair(1, 0.1));

        let old = reg.get("first").unwrap();
        reg.insert_or_replace("first", pair(5, 0.5));

        assert_eq!(reg.ids(), vec!["first", "second"]);
        assert_eq!(reg.get("first").unwrap().len(), 5);

        // Holders of the old trajectory are unaffected
        assert_eq!(old.len(), 1);
    }

    #[test]
    fn test_empty_path_not_registered() {
        let mut reg = PathRegistry::new();

        assert!(!reg.insert_or_replace("empty", TrajectoryPair::empty()));
        assert!(reg.is_empty());

        // An empty path doesn't clobber an existing one either
        reg.insert_or_replace("path", pair(4, 1.0));
        assert!(!reg.insert_or_replace("path", TrajectoryPair::empty()));
        assert_eq!(reg.get("path").unwrap().len(), 4);
    }

    #[test]
    fn test_remove() {
        let mut reg = PathRegistry::new();
        reg.insert_or_replace("a", pair(1, 0.1));
        reg.insert_or_replace("b", pair(1, 0.1));
        reg.insert_or_replace("c", pair(1, 0.1));

        assert!(reg.remove("b").is_some());
        assert_eq!(reg.ids(), vec!["a", "c"]);
        assert!(!reg.contains("b"));

        assert!(reg.remove("not a path").is_none());
        assert_eq!(reg.len(), 2);
    }
}
