//! Buffer/record reconciliation and active-selection switches.
//!
//! `ui_dirty` means a buffer was edited, `request_dirty` means the record
//! under the buffers changed. `auto_sync` is driven once per UI frame.

use crate::app::content::BodyKind;
use crate::app::state::AppState;
use crate::constants::HTTP_METHODS;
use crate::error::{user_message, Result};
use crate::models::request::method_supports_body;
use crate::storage::load_collection;
use crate::util::now_epoch;

impl AppState {
    /// Flush the buffers into the edited record.
    ///
    /// Returns true when the record changed. `unsaved_changes` is only set
    /// when that record lives in a collection. The collection-default auth
    /// buffer is written into the active collection here too.
    pub fn sync_ui_to_request(&mut self) -> bool {
        let method = self.selected_method();
        let in_collection = self.is_editing_collection_request();
        if !self.body_kind.uses_body_buffer() {
            self.content.sync_to_body(self.body_kind);
        }

        let request = match self.manager.active_request_mut() {
            Some(request) => request,
            None => &mut self.current_request,
        };
        let mut changed = false;
        let mut failure = None;

        if request.method() != method {
            match request.set_method(method) {
                Ok(()) => changed = true,
                Err(e) => failure = Some(e),
            }
        }

        if request.url() != self.url_buffer {
            match request.set_url(&self.url_buffer) {
                Ok(()) => changed = true,
                Err(e) => failure = Some(e),
            }
        }

        if method_supports_body(method) {
            let body = self.content.body.as_bytes();
            if request.body().unwrap_or_default() != body {
                match request.set_body(body) {
                    Ok(()) => changed = true,
                    Err(e) => failure = Some(e),
                }
            }
        }

        if request.auth != self.auth {
            request.auth = self.auth.clone();
            request.auth.clamp_to_bounds();
            changed = true;
        }

        if self.flush_collection_default_auth() {
            changed = true;
        }

        if let Some(e) = failure {
            tracing::warn!(error = %e, "Rejected edit while syncing buffers");
            self.status_message = user_message(e.kind(), "apply edit");
        }

        if changed && in_collection {
            self.touch_active_collection();
            self.mark_changed();
        }
        self.ui_dirty = false;
        changed
    }

    /// Write the collection-default auth buffer into the active collection.
    pub(crate) fn flush_collection_default_auth(&mut self) -> bool {
        let Some(collection) = self.manager.active_collection_mut() else {
            return false;
        };
        if let Some(auth) = self.collection_default_auth.as_mut() {
            auth.clamp_to_bounds();
        }
        if collection.default_auth == self.collection_default_auth {
            return false;
        }
        collection.default_auth = self.collection_default_auth.clone();
        collection.update_modified_time();
        self.mark_changed();
        true
    }

    /// Project the edited record into the buffers and pick the body editor
    /// from `Content-Type`, falling back to sniffing the body.
    pub fn sync_request_to_ui(&mut self) {
        let request = match self.manager.active_request() {
            Some(request) => request,
            None => &self.current_request,
        };

        self.url_buffer = request.url().to_string();
        self.method_index = HTTP_METHODS
            .iter()
            .position(|m| *m == request.method())
            .unwrap_or(0);
        self.auth = request.auth.clone();

        let body = request.body_text().map(|b| b.into_owned()).unwrap_or_default();
        let declared = request.content_type().and_then(BodyKind::from_content_type);
        let kind = match declared {
            Some(kind) => kind,
            None if body.is_empty() => self.body_kind,
            None => BodyKind::sniff(&body),
        };

        self.content.clear_all();
        self.content.body = body;
        if !kind.uses_body_buffer() {
            let body = self.content.body.clone();
            *self.content.get_mut(kind) = body;
        }
        self.body_kind = kind;

        self.collection_default_auth = self
            .manager
            .active_collection()
            .and_then(|c| c.default_auth.clone());
        self.request_dirty = false;
        tracing::debug!(body_kind = kind.as_str(), "Projected request into buffers");
    }

    /// One reconciliation step. Returns true when something was synced.
    pub fn auto_sync(&mut self) -> bool {
        if self.request_dirty {
            self.sync_request_to_ui();
            return true;
        }
        if self.ui_dirty && !self.dialogs.any_open() {
            self.sync_ui_to_request();
            self.last_ui_sync = now_epoch();
            return true;
        }
        false
    }

    /// Switch collections without losing pending edits. The collection is
    /// re-read from disk only when nothing in memory is unsaved.
    pub fn set_active_collection(&mut self, index: usize) -> Result<()> {
        if self.ui_dirty {
            self.sync_ui_to_request();
        }
        self.flush_collection_default_auth();
        let changing = self.manager.active_collection_index() != Some(index);
        self.manager.set_active_collection(index)?;

        if changing && !self.unsaved_changes {
            self.reload_collection(index);
        }

        if let Some(collection) = self.manager.collection(index) {
            self.collection_default_auth = collection.default_auth.clone();
            self.settings.collections.last_active_collection = Some(collection.id.clone());
            tracing::debug!(collection = %collection.id, "Active collection changed");
        }

        match self.manager.active_request_index() {
            Some(request) => self.set_active_request(request),
            None => {
                self.clear_request_buffers();
                Ok(())
            }
        }
    }

    fn reload_collection(&mut self, index: usize) {
        let Some(id) = self.manager.collection(index).map(|c| c.id.clone()) else {
            return;
        };
        let path = match self.layout.collection_path(&id) {
            Ok(path) if path.exists() => path,
            _ => return,
        };
        match load_collection(&path) {
            Ok(fresh) if fresh.id == id => {
                if let Err(e) = self.manager.replace_collection(index, fresh) {
                    tracing::warn!(collection = %id, error = %e, "Reload not applied");
                }
            }
            Ok(fresh) => {
                tracing::warn!(collection = %id, found = %fresh.id, "Collection file id mismatch, keeping memory copy");
            }
            Err(e) => {
                tracing::warn!(collection = %id, error = %e, "Reload failed, keeping memory copy");
            }
        }
    }

    /// Select a request of the active collection and project it.
    pub fn set_active_request(&mut self, index: usize) -> Result<()> {
        if self.ui_dirty {
            self.sync_ui_to_request();
        }
        self.flush_collection_default_auth();
        self.manager.set_active_request(index)?;
        self.request_dirty = true;
        self.sync_request_to_ui();
        Ok(())
    }
}
