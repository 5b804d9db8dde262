//! One-time import of the legacy `saved_requests.json` list

use std::fs;
use std::path::Path;

use crate::constants::{MIGRATED_COLLECTION_DESCRIPTION, MIGRATED_COLLECTION_NAME};
use crate::error::{CoreError, Result};
use crate::models::{Collection, CollectionManager};
use crate::storage::collection_file::{
    handle_corrupted_file, save_collection, validate_collection_file, RequestRecord,
};
use crate::storage::layout::{copy_file, read_file, StorageLayout};
use crate::util::now_epoch;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Marker present, nothing to do
    AlreadyDone,
    /// No legacy file; marker written so later runs skip
    NoLegacyData,
    Migrated { requests: usize, collection: usize },
}

/// Run the legacy migration if the marker is absent.
///
/// The legacy file is copied to `saved_requests_backup.json` and left in
/// place. An unreadable legacy file is backed up as corrupted and the marker
/// is not written.
pub fn run_migration(layout: &StorageLayout, manager: &mut CollectionManager) -> Result<MigrationOutcome> {
    let marker = layout.migration_marker_path();
    if marker.exists() {
        return Ok(MigrationOutcome::AlreadyDone);
    }
    layout.ensure_dirs()?;

    let legacy = layout.legacy_requests_path();
    if !legacy.exists() {
        write_marker(layout)?;
        tracing::info!("No legacy requests to migrate");
        return Ok(MigrationOutcome::NoLegacyData);
    }

    let corrupted = |e| handle_corrupted_file(&legacy, "migrate saved requests", e);
    validate_collection_file(&legacy).map_err(corrupted)?;
    copy_file(&legacy, &layout.legacy_backup_path())?;
    let records = read_legacy(&legacy).map_err(corrupted)?;

    let mut collection = Collection::new(MIGRATED_COLLECTION_NAME, MIGRATED_COLLECTION_DESCRIPTION)?;
    let count = records.len();
    for record in records {
        let (name, request) = record.into_request();
        collection.push_persisted(request, &name);
    }
    collection.update_modified_time();

    let path = layout.collection_path(&collection.id)?;
    save_collection(&collection, &path)?;
    let index = manager.add_collection(collection);
    write_marker(layout)?;

    tracing::info!(requests = count, "Migrated legacy saved requests");
    Ok(MigrationOutcome::Migrated {
        requests: count,
        collection: index,
    })
}

fn read_legacy(path: &Path) -> Result<Vec<RequestRecord>> {
    let bytes = read_file(path)?;
    serde_json::from_slice(&bytes).map_err(|e| CoreError::InvalidJson {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn write_marker(layout: &StorageLayout) -> Result<()> {
    let path = layout.migration_marker_path();
    fs::write(&path, format!("migrated at {}\n", now_epoch()))
        .map_err(|e| CoreError::from_io(&path, e))
}
