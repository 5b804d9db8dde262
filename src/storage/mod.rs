//! Persistence - JSON files under the storage root
//!
//! One file per collection, a manifest with the active selection and
//! collection order, settings, and the legacy migration.

pub mod collection_file;
pub mod layout;
pub mod manifest;
pub mod migration;
pub mod settings;

use std::fs;
use std::path::PathBuf;

use crate::error::{CoreError, Result};
use crate::models::{Collection, CollectionManager};

pub use collection_file::{handle_corrupted_file, load_collection, save_collection, validate_collection_file};
pub use layout::StorageLayout;
pub use manifest::StateManifest;
pub use migration::{run_migration, MigrationOutcome};
pub use settings::{CollectionSettings, HttpSettings, Settings, UiSettings};

/// Result of [`load_all`]. Failures of individual files are collected here
/// instead of aborting the load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped_duplicates: usize,
    pub errors: Vec<(PathBuf, CoreError)>,
    /// True when the manifest's selection was applied
    pub selection_restored: bool,
}

impl LoadReport {
    pub fn corruption_count(&self) -> usize {
        self.errors.iter().filter(|(_, e)| e.is_corruption()).count()
    }
}

/// Write every collection to `collections/<id>.json`, then the manifest.
/// Stops at the first collection that fails to save.
pub fn save_all(layout: &StorageLayout, manager: &CollectionManager) -> Result<()> {
    layout.ensure_dirs()?;
    for collection in manager.collections() {
        let path = layout.collection_path(&collection.id)?;
        save_collection(collection, &path)?;
    }
    manifest::save_manifest(&layout.state_path(), &StateManifest::from_manager(manager))?;
    tracing::info!(collections = manager.len(), "Saved all collections");
    Ok(())
}

/// Load every `collections/*.json` into `manager`, skipping ids already
/// present. Collections listed in the manifest come first, in its order.
pub fn load_all(layout: &StorageLayout, manager: &mut CollectionManager) -> Result<LoadReport> {
    let mut report = LoadReport::default();

    let manifest = match manifest::load_manifest(&layout.state_path()) {
        Ok(manifest) => manifest,
        Err(e) => {
            report.errors.push((layout.state_path(), e));
            None
        }
    };

    let dir = layout.collections_dir();
    if !dir.is_dir() {
        return Ok(report);
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
        .map_err(|e| CoreError::from_io(&dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut loaded: Vec<Collection> = Vec::new();
    for path in paths {
        match load_collection(&path) {
            Ok(collection) => {
                let duplicate = manager.find_collection_by_id(&collection.id).is_some()
                    || loaded.iter().any(|c| c.id == collection.id);
                if duplicate {
                    tracing::warn!(collection = %collection.id, path = %path.display(), "Skipping duplicate collection id");
                    report.skipped_duplicates += 1;
                    continue;
                }
                loaded.push(collection);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to load collection");
                report.errors.push((path, e));
            }
        }
    }

    if let Some(manifest) = &manifest {
        // stable: unlisted collections keep file-name order after listed ones
        loaded.sort_by_key(|c| manifest.position_of(&c.id).unwrap_or(usize::MAX));
    }

    let first_new = manager.len();
    report.loaded = loaded.len();
    for collection in loaded {
        manager.add_collection(collection);
    }

    if let Some(manifest) = &manifest {
        report.selection_restored = restore_selection(manager, manifest, first_new);
    }

    tracing::info!(
        loaded = report.loaded,
        errors = report.errors.len(),
        "Loaded collections"
    );
    Ok(report)
}

fn restore_selection(manager: &mut CollectionManager, manifest: &StateManifest, first_new: usize) -> bool {
    let by_id = manifest
        .active_collection_id
        .as_deref()
        .and_then(|id| manager.find_collection_by_id(id));
    let by_index = manifest
        .active_collection()
        .map(|i| i + first_new)
        .filter(|i| *i < manager.len());

    let Some(index) = by_id.or(by_index) else {
        return false;
    };
    if manager.set_active_collection(index).is_err() {
        return false;
    }
    if let Some(request) = manifest.active_request() {
        // out-of-range indices keep the default selection
        let _ = manager.set_active_request(request);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Request;

    fn collection(name: &str, requests: usize) -> Collection {
        let mut c = Collection::new(name, "").unwrap();
        for i in 0..requests {
            let req = Request::new("GET", &format!("https://h/{}", i)).unwrap();
            c.add_request(&req, &format!("r{}", i)).unwrap();
        }
        c
    }

    #[test]
    fn test_save_all_then_load_all() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());

        let mut manager = CollectionManager::new();
        manager.add_collection(collection("Zeta", 1));
        manager.add_collection(collection("Alpha", 3));
        manager.set_active_collection(1).unwrap();
        manager.set_active_request(2).unwrap();
        save_all(&layout, &manager).unwrap();

        let mut restored = CollectionManager::new();
        let report = load_all(&layout, &mut restored).unwrap();
        assert_eq!(report.loaded, 2);
        assert!(report.errors.is_empty());
        assert!(report.selection_restored);
        assert_eq!(restored.collections()[0].name(), "Zeta");
        assert_eq!(restored.collections()[1].name(), "Alpha");
        assert_eq!(restored.active_collection_index(), Some(1));
        assert_eq!(restored.active_request_index(), Some(2));
    }

    #[test]
    fn test_load_all_skips_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        let mut manager = CollectionManager::new();
        manager.add_collection(collection("A", 0));
        save_all(&layout, &manager).unwrap();

        let report = load_all(&layout, &mut manager).unwrap();
        assert_eq!(report.loaded, 0);
        assert_eq!(report.skipped_duplicates, 1);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_load_all_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().join("fresh"));
        let mut manager = CollectionManager::new();
        let report = load_all(&layout, &mut manager).unwrap();
        assert_eq!(report.loaded, 0);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_corrupt_files_are_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        let mut manager = CollectionManager::new();
        manager.add_collection(collection("Good", 1));
        save_all(&layout, &manager).unwrap();
        fs::write(layout.collections_dir().join("empty.json"), b"").unwrap();
        fs::write(layout.collections_dir().join("page.json"), b"<html>").unwrap();

        let mut restored = CollectionManager::new();
        let report = load_all(&layout, &mut restored).unwrap();
        assert_eq!(report.loaded, 1);
        assert_eq!(report.corruption_count(), 2);
        assert!(layout.collections_dir().join("empty.json.corrupted.backup").exists());
        assert!(layout.collections_dir().join("page.json.corrupted.backup").exists());
    }
}
