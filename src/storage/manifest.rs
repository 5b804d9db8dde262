//! `collections_state.json` and its auto-save snapshot

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::models::CollectionManager;
use crate::storage::collection_file::handle_corrupted_file;
use crate::storage::layout::{read_file, write_atomic};
use crate::util::now_epoch;

fn unset_index() -> i64 {
    -1
}

/// Active selection and collection order. Indices use -1 for "none".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateManifest {
    #[serde(default = "unset_index")]
    pub active_collection_index: i64,
    #[serde(default = "unset_index")]
    pub active_request_index: i64,
    /// Id of the active collection; survives reordering better than the index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_collection_id: Option<String>,
    #[serde(default)]
    pub collection_ids: Vec<String>,
    #[serde(default)]
    pub saved_at: i64,
}

impl Default for StateManifest {
    fn default() -> Self {
        StateManifest {
            active_collection_index: -1,
            active_request_index: -1,
            active_collection_id: None,
            collection_ids: Vec::new(),
            saved_at: 0,
        }
    }
}

fn encode_index(index: Option<usize>) -> i64 {
    index.map(|i| i as i64).unwrap_or(-1)
}

fn decode_index(index: i64) -> Option<usize> {
    usize::try_from(index).ok()
}

impl StateManifest {
    pub fn from_manager(manager: &CollectionManager) -> Self {
        StateManifest {
            active_collection_index: encode_index(manager.active_collection_index()),
            active_request_index: encode_index(manager.active_request_index()),
            active_collection_id: manager.active_collection().map(|c| c.id.clone()),
            collection_ids: manager.collections().iter().map(|c| c.id.clone()).collect(),
            saved_at: now_epoch(),
        }
    }

    pub fn active_collection(&self) -> Option<usize> {
        decode_index(self.active_collection_index)
    }

    pub fn active_request(&self) -> Option<usize> {
        decode_index(self.active_request_index)
    }

    /// Position of `id` in the saved order, if listed.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.collection_ids.iter().position(|c| c == id)
    }
}

pub fn save_manifest(path: &Path, manifest: &StateManifest) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(manifest).map_err(|e| CoreError::InvalidJson {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    write_atomic(path, &bytes)
}

/// `Ok(None)` when no manifest exists yet. A corrupt manifest is backed up
/// and reported.
pub fn load_manifest(path: &Path) -> Result<Option<StateManifest>> {
    let bytes = match read_file(path) {
        Ok(bytes) => bytes,
        Err(CoreError::FileNotFound(_)) => return Ok(None),
        Err(e) => return Err(e),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| {
            let err = CoreError::InvalidJson {
                path: path.to_path_buf(),
                reason: e.to_string(),
            };
            handle_corrupted_file(path, "load collection state", err)
        })
}

/// Manifest-only snapshot written by auto-save.
pub fn write_auto_save_backup(path: &Path, manager: &CollectionManager) -> Result<()> {
    save_manifest(path, &StateManifest::from_manager(manager))
}
