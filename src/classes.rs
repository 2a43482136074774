//! Classroom registry: the authoritative list of valid classroom labels,
//! independent of which users currently reference them.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// Classrooms offered when the registry is empty and no user carries one yet.
pub const DEFAULT_CLASSES: &[&str] = &[
    "1A", "2A", "3A", "4A", "5A", //
    "1B", "2B", "3B", "4B", "5B", //
    "1C", "2C", "3C", "4C", "5C", //
    "1D", "2D", "3D", "4D", "5D", //
    "1E", "2E", "3E", "4E", "5E", //
    "1F", "2F", "3F", "4F", "5F", //
    "1G", "2G", "3G", //
    "1H", "2H", "3H", "4H", "5H", //
    "2L", "3L",
];

#[derive(Debug, Default, Serialize, Deserialize)]
struct SavedClasses {
    classes: Vec<String>,
}

/// Mutable list of classroom labels, persisted to its own JSON document.
///
/// Removing a label does not validate or reassign users still holding it;
/// callers are expected to block removal of in-use labels.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    list: Vec<String>,
    path: Option<PathBuf>,
}

impl ClassRegistry {
    /// In-memory registry with no backing file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry backed by a JSON file, loading any previously saved list.
    pub fn open(path: PathBuf) -> Self {
        let list = fs::read_to_string(&path)
            .ok()
            .and_then(|json| serde_json::from_str::<SavedClasses>(&json).ok())
            .map(|saved| saved.classes)
            .unwrap_or_default();
        Self {
            list,
            path: Some(path),
        }
    }

    /// Returns the valid classroom labels.
    ///
    /// Resolution order: the stored list if non-empty, else the distinct
    /// classrooms derived from `user_classes` (empty and "Admin" entries
    /// excluded), else [`DEFAULT_CLASSES`]. The resolved list is memoized
    /// into the registry.
    pub fn available<'a, I>(&mut self, user_classes: I) -> Vec<String>
    where
        I: Iterator<Item = &'a str>,
    {
        if self.list.is_empty() {
            let mut derived: Vec<String> = user_classes
                .filter(|room| !room.is_empty() && *room != crate::model::ADMIN_CLASSROOM)
                .map(|room| room.to_string())
                .collect();
            derived.sort();
            derived.dedup();

            if derived.is_empty() {
                derived = DEFAULT_CLASSES.iter().map(|s| s.to_string()).collect();
            }
            self.list = derived;
            self.persist();
        }
        self.list.clone()
    }

    /// Replaces the list with `new_list`, sorted, and persists it.
    pub fn update(&mut self, mut new_list: Vec<String>) -> Vec<String> {
        new_list.sort();
        self.list = new_list;
        self.persist();
        self.list.clone()
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let saved = SavedClasses {
            classes: self.list.clone(),
        };
        match serde_json::to_string_pretty(&saved) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    warn!("failed to persist class list to {}: {}", path.display(), e);
                }
            }
            Err(e) => warn!("failed to serialize class list: {}", e),
        }
    }
}
