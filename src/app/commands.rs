//! Command handlers - editing operations and saving

use crate::app::state::AppState;
use crate::error::{user_message, CoreError, Result};
use crate::models::{Collection, Request, RequestAuth, Response};
use crate::storage::{self, manifest};
use crate::util::now_epoch;

impl AppState {
    // ========================
    // Collections
    // ========================

    /// Create an empty collection. The first one becomes active.
    pub fn create_collection(&mut self, name: &str, description: &str) -> Result<usize> {
        let collection = Collection::new(name, description)?;
        let id = collection.id.clone();
        let was_empty = self.manager.is_empty();
        let index = self.manager.add_collection(collection);
        if was_empty {
            self.collection_default_auth = None;
            self.settings.collections.last_active_collection = Some(id.clone());
            self.request_dirty = true;
            self.sync_request_to_ui();
        }
        self.mark_changed();
        tracing::info!(collection = %id, name, "Collection created");
        Ok(index)
    }

    /// Remove a collection and delete its file.
    pub fn remove_collection(&mut self, index: usize) -> Result<()> {
        if self.ui_dirty {
            self.sync_ui_to_request();
        }
        let was_active = self.manager.active_collection_index() == Some(index);
        let removed = self.manager.remove_collection(index)?;

        let path = self.layout.collection_path(&removed.id)?;
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| CoreError::from_io(&path, e))?;
        }
        if was_active {
            self.collection_default_auth = self
                .manager
                .active_collection()
                .and_then(|c| c.default_auth.clone());
            self.settings.collections.last_active_collection =
                self.manager.active_collection().map(|c| c.id.clone());
            if self.manager.active_request_index().is_some() {
                self.request_dirty = true;
                self.sync_request_to_ui();
            } else {
                self.clear_request_buffers();
            }
        }
        self.mark_changed();
        tracing::info!(collection = %removed.id, "Collection removed");
        Ok(())
    }

    pub fn rename_active_collection(&mut self, name: &str) -> Result<()> {
        let collection = self
            .manager
            .active_collection_mut()
            .ok_or(CoreError::NullParam("active collection"))?;
        collection.set_name(name)?;
        self.mark_changed();
        Ok(())
    }

    /// Set the active collection's default auth. Requests whose own auth
    /// kind is `None` send with it.
    pub fn set_collection_default_auth(&mut self, auth: Option<RequestAuth>) -> Result<()> {
        let mut auth = auth;
        if let Some(auth) = auth.as_mut() {
            auth.clamp_to_bounds();
        }
        let collection = self
            .manager
            .active_collection_mut()
            .ok_or(CoreError::NullParam("active collection"))?;
        collection.default_auth = auth.clone();
        collection.update_modified_time();
        self.collection_default_auth = auth;
        self.mark_changed();
        Ok(())
    }

    // ========================
    // Requests
    // ========================

    /// Store a copy of the edited request in the active collection and select it.
    pub fn add_request_to_active_collection(&mut self, name: &str) -> Result<usize> {
        if self.manager.active_collection().is_none() {
            return Err(CoreError::NullParam("active collection"));
        }
        self.sync_ui_to_request();
        let request = self.target_request().clone();
        let index = self
            .manager
            .active_collection_mut()
            .ok_or(CoreError::NullParam("active collection"))?
            .add_request(&request, name)?;
        self.mark_changed();
        self.set_active_request(index)?;
        Ok(index)
    }

    pub fn duplicate_active_request(&mut self) -> Result<usize> {
        if self.ui_dirty {
            self.sync_ui_to_request();
        }
        let request = self
            .manager
            .active_request_index()
            .ok_or(CoreError::NullParam("active request"))?;
        let index = self
            .manager
            .active_collection_mut()
            .ok_or(CoreError::NullParam("active collection"))?
            .duplicate_request(request)?;
        self.mark_changed();
        self.set_active_request(index)?;
        Ok(index)
    }

    pub fn rename_request(&mut self, index: usize, name: &str) -> Result<()> {
        self.manager
            .active_collection_mut()
            .ok_or(CoreError::NullParam("active collection"))?
            .rename_request(index, name)?;
        self.mark_changed();
        Ok(())
    }

    /// Remove a request of the active collection, keeping the selection valid.
    pub fn remove_request(&mut self, index: usize) -> Result<()> {
        if self.ui_dirty {
            self.sync_ui_to_request();
        }
        let active = self.manager.active_request_index();
        self.manager
            .active_collection_mut()
            .ok_or(CoreError::NullParam("active collection"))?
            .remove_request(index)?;

        if let Some(active) = active {
            if index < active {
                self.manager.set_active_request(active - 1)?;
            }
        }
        self.manager.clamp_active_request();
        if self.manager.active_request_index().is_some() {
            self.request_dirty = true;
            self.sync_request_to_ui();
        } else {
            self.clear_request_buffers();
        }
        self.mark_changed();
        Ok(())
    }

    /// Start a fresh scratch request. The collection stays selected.
    pub fn new_scratch_request(&mut self) {
        if self.ui_dirty {
            self.sync_ui_to_request();
        }
        self.manager.clear_active_request();
        self.current_request = Request::default();
        self.current_response = Response::default();
        self.clear_request_buffers();
        self.auth = self.current_request.auth.clone();
    }

    // ========================
    // Headers
    // ========================

    /// Add the header typed into the scratch fields to the edited request.
    pub fn add_header_from_scratch(&mut self) -> Result<usize> {
        let name = self.header_name_buffer.trim().to_string();
        let value = self.header_value_buffer.trim().to_string();
        let in_collection = self.is_editing_collection_request();

        let result = self.target_request_mut().headers.add(&name, &value);
        match result {
            Ok(index) => {
                self.header_name_buffer.clear();
                self.header_value_buffer.clear();
                if in_collection {
                    self.touch_active_collection();
                    self.mark_changed();
                }
                Ok(index)
            }
            Err(e) => {
                tracing::warn!(header = %name, error = %e, "Header rejected");
                self.status_message = user_message(e.kind(), "add header");
                Err(e)
            }
        }
    }

    pub fn remove_header(&mut self, index: usize) -> Result<()> {
        let in_collection = self.is_editing_collection_request();
        self.target_request_mut().headers.remove(index)?;
        if in_collection {
            self.touch_active_collection();
            self.mark_changed();
        }
        Ok(())
    }

    // ========================
    // Saving
    // ========================

    pub fn should_auto_save(&self) -> bool {
        self.should_auto_save_at(now_epoch())
    }

    /// Due when enabled, something is unsaved, and the interval has elapsed.
    pub fn should_auto_save_at(&self, now: i64) -> bool {
        let collections = &self.settings.collections;
        collections.auto_save_enabled
            && self.unsaved_changes
            && now.saturating_sub(self.last_auto_save) >= collections.auto_save_interval as i64
    }

    pub fn perform_auto_save(&mut self) -> Result<bool> {
        self.perform_auto_save_at(now_epoch())
    }

    /// Save everything if due. Returns whether a save ran.
    pub fn perform_auto_save_at(&mut self, now: i64) -> Result<bool> {
        if !self.should_auto_save_at(now) {
            return Ok(false);
        }
        self.save_all_collections()?;
        let backup = self.layout.auto_save_backup_path();
        if let Err(e) = manifest::write_auto_save_backup(&backup, &self.manager) {
            tracing::warn!(error = %e, "Auto-save snapshot failed");
        }
        self.last_auto_save = now;
        tracing::info!("Auto-saved collections");
        Ok(true)
    }

    /// Flush pending edits, then write every collection, the manifest and
    /// settings.
    pub fn save_all_collections(&mut self) -> Result<()> {
        if self.ui_dirty {
            self.sync_ui_to_request();
        }
        self.flush_collection_default_auth();
        self.settings.collections.last_active_collection =
            self.manager.active_collection().map(|c| c.id.clone());

        let result = storage::save_all(&self.layout, &self.manager)
            .and_then(|()| self.settings.save(&self.layout.settings_path()));
        match result {
            Ok(()) => {
                self.mark_saved();
                self.status_message = format!("Saved {} collection(s)", self.manager.len());
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Save failed");
                self.status_message = user_message(e.kind(), "save collections");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::content::BodyKind;
    use crate::storage::{Settings, StorageLayout};

    fn fresh() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(StorageLayout::new(dir.path()), Settings::default());
        (dir, state)
    }

    #[test]
    fn test_create_and_remove_collection() {
        let (_dir, mut state) = fresh();
        let a = state.create_collection("A", "").unwrap();
        state.create_collection("B", "").unwrap();
        assert_eq!(state.manager.active_collection_index(), Some(a));
        assert!(state.create_collection("", "").is_err());

        state.save_all_collections().unwrap();
        let path = state
            .layout
            .collection_path(&state.manager.collection(0).unwrap().id)
            .unwrap();
        assert!(path.exists());

        state.remove_collection(0).unwrap();
        assert!(!path.exists());
        assert_eq!(state.manager.len(), 1);
        assert_eq!(state.active_collection().unwrap().name(), "B");
        assert!(state.has_unsaved_changes());
    }

    #[test]
    fn test_save_scratch_into_collection() {
        let (_dir, mut state) = fresh();
        assert!(matches!(
            state.add_request_to_active_collection("x"),
            Err(CoreError::NullParam(_))
        ));
        state.create_collection("C", "").unwrap();
        state.url_buffer = "https://api.example.com/items".into();
        state.mark_ui_dirty();

        let index = state.add_request_to_active_collection("Items").unwrap();
        assert_eq!(index, 0);
        assert_eq!(state.manager.active_request_index(), Some(0));
        assert_eq!(state.active_request().unwrap().url(), "https://api.example.com/items");
        assert_eq!(state.url_buffer, "https://api.example.com/items");
    }

    #[test]
    fn test_duplicate_rename_remove_requests() {
        let (_dir, mut state) = fresh();
        state.create_collection("C", "").unwrap();
        state.url_buffer = "https://h/1".into();
        state.add_request_to_active_collection("One").unwrap();

        let copy = state.duplicate_active_request().unwrap();
        assert_eq!(state.active_collection().unwrap().request_name(copy), Some("One (Copy)"));
        state.rename_request(copy, "Two").unwrap();
        assert_eq!(state.active_collection().unwrap().request_name(1), Some("Two"));

        state.remove_request(0).unwrap();
        assert_eq!(state.manager.active_request_index(), Some(0));
        assert_eq!(state.active_collection().unwrap().request_name(0), Some("Two"));
        state.remove_request(0).unwrap();
        assert_eq!(state.manager.active_request_index(), None);
        assert!(state.url_buffer.is_empty());
    }

    #[test]
    fn test_header_scratch() {
        let (_dir, mut state) = fresh();
        state.header_name_buffer = "Accept".into();
        state.header_value_buffer = "application/json".into();
        assert_eq!(state.add_header_from_scratch().unwrap(), 0);
        assert!(state.header_name_buffer.is_empty());
        assert_eq!(state.current_request.headers.get("accept"), Some("application/json"));

        state.header_name_buffer = "Bad Name".into();
        assert!(state.add_header_from_scratch().is_err());
        assert_eq!(state.header_name_buffer, "Bad Name");
        assert!(!state.status_message.is_empty());

        state.remove_header(0).unwrap();
        assert!(state.current_request.headers.is_empty());
        assert!(state.remove_header(0).is_err());
    }

    #[test]
    fn test_body_kind_rewrites_content_type() {
        let (_dir, mut state) = fresh();
        state.create_collection("C", "").unwrap();
        state.add_request_to_active_collection("R").unwrap();
        state.mark_saved();

        state.set_body_kind(BodyKind::Xml);
        let req = state.active_request().unwrap();
        assert_eq!(req.content_type(), Some("application/xml"));
        assert!(state.has_unsaved_changes());

        state.set_body_kind(BodyKind::FormData);
        let ct = state.active_request().unwrap().content_type().unwrap().to_string();
        assert!(ct.ends_with("boundary=TinyRequestFormBoundary1234567890"));
        assert_eq!(state.active_request().unwrap().headers.len(), 1);
    }

    #[test]
    fn test_new_scratch_request_keeps_collection() {
        let (_dir, mut state) = fresh();
        state.create_collection("C", "").unwrap();
        state.url_buffer = "https://h/".into();
        state.add_request_to_active_collection("R").unwrap();
        state.new_scratch_request();
        assert_eq!(state.manager.active_collection_index(), Some(0));
        assert_eq!(state.manager.active_request_index(), None);
        assert!(state.url_buffer.is_empty());
        assert!(!state.is_editing_collection_request());
    }

    #[test]
    fn test_set_collection_default_auth_is_saved() {
        let (_dir, mut state) = fresh();
        assert!(matches!(
            state.set_collection_default_auth(Some(RequestAuth::bearer("x"))),
            Err(CoreError::NullParam(_))
        ));

        state.create_collection("C", "").unwrap();
        state.save_all_collections().unwrap();
        assert!(!state.has_unsaved_changes());

        state
            .set_collection_default_auth(Some(RequestAuth::bearer("edited")))
            .unwrap();
        assert!(state.has_unsaved_changes());
        assert_eq!(state.collection_default_auth, Some(RequestAuth::bearer("edited")));
        state.save_all_collections().unwrap();

        let id = state.active_collection().unwrap().id.clone();
        let path = state.layout.collection_path(&id).unwrap();
        let loaded = crate::storage::load_collection(&path).unwrap();
        assert_eq!(loaded.default_auth, Some(RequestAuth::bearer("edited")));

        state.set_collection_default_auth(None).unwrap();
        assert_eq!(state.active_collection().unwrap().default_auth, None);

        // a buffer edit alone is still written out
        state.collection_default_auth = Some(RequestAuth::bearer("buffered"));
        state.save_all_collections().unwrap();
        let loaded = crate::storage::load_collection(&path).unwrap();
        assert_eq!(loaded.default_auth, Some(RequestAuth::bearer("buffered")));
    }

    #[test]
    fn test_auto_save_timing() {
        let (dir, mut state) = fresh();
        state.create_collection("C", "").unwrap();
        let start = state.last_auto_save();
        assert!(!state.should_auto_save_at(start + 10));
        assert!(state.should_auto_save_at(start + 300));

        assert!(state.perform_auto_save_at(start + 300).unwrap());
        assert_eq!(state.last_auto_save(), start + 300);
        assert!(!state.has_unsaved_changes());
        assert!(dir.path().join("auto_save/collections_backup.json").exists());
        assert!(dir.path().join("settings.json").exists());

        state.mark_changed();
        assert!(!state.perform_auto_save_at(start + 400).unwrap());
        state.settings.collections.auto_save_enabled = false;
        assert!(!state.should_auto_save_at(start + 10_000));
    }
}
