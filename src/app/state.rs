//! App state - editable buffers over the canonical collection records

use crate::app::content::{BodyKind, ContentBuffers};
use crate::constants::HTTP_METHODS;
use crate::error::Result;
use crate::models::{Collection, CollectionManager, Request, RequestAuth, Response};
use crate::storage::{self, LoadReport, Settings, StorageLayout};
use crate::util::now_epoch;

/// Modal dialogs. While any is open, buffered edits are not flushed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DialogFlags {
    pub new_collection: bool,
    pub rename_collection: bool,
    pub new_request: bool,
    pub rename_request: bool,
    pub confirm_delete: bool,
    pub settings: bool,
}

impl DialogFlags {
    pub fn any_open(&self) -> bool {
        self.new_collection
            || self.rename_collection
            || self.new_request
            || self.rename_request
            || self.confirm_delete
            || self.settings
    }

    pub fn close_all(&mut self) {
        *self = DialogFlags::default();
    }
}

/// Main application state.
///
/// The UI edits the buffers; the active `Request` inside the manager (or the
/// scratch `current_request` when none is selected) is the canonical record.
/// The two are reconciled by the sync calls in `app::sync`.
pub struct AppState {
    pub manager: CollectionManager,
    pub layout: StorageLayout,
    pub settings: Settings,

    // Scratch request used when no collection request is selected
    pub current_request: Request,
    pub current_response: Response,

    // Editable buffers
    pub url_buffer: String,
    pub method_index: usize,
    pub content: ContentBuffers,
    pub body_kind: BodyKind,
    pub header_name_buffer: String,
    pub header_value_buffer: String,

    // Auth scratch: the edited request's own auth, and the collection default
    pub auth: RequestAuth,
    pub collection_default_auth: Option<RequestAuth>,

    pub dialogs: DialogFlags,
    pub status_message: String,

    // Dirty bits
    pub(crate) ui_dirty: bool,
    pub(crate) request_dirty: bool,
    pub(crate) unsaved_changes: bool,
    pub(crate) request_in_progress: bool,

    pub(crate) last_ui_sync: i64,
    pub(crate) last_auto_save: i64,

    /// Outcome of the startup load
    pub load_report: LoadReport,
}

impl AppState {
    /// Empty state over `layout` with the given settings; nothing is read.
    pub fn new(layout: StorageLayout, settings: Settings) -> Self {
        let now = now_epoch();
        AppState {
            manager: CollectionManager::new(),
            layout,
            settings,
            current_request: Request::default(),
            current_response: Response::default(),
            url_buffer: String::new(),
            method_index: 0,
            content: ContentBuffers::default(),
            body_kind: BodyKind::default(),
            header_name_buffer: String::new(),
            header_value_buffer: String::new(),
            auth: RequestAuth::default(),
            collection_default_auth: None,
            dialogs: DialogFlags::default(),
            status_message: String::new(),
            ui_dirty: false,
            request_dirty: false,
            unsaved_changes: false,
            request_in_progress: false,
            last_ui_sync: now,
            last_auto_save: now,
            load_report: LoadReport::default(),
        }
    }

    /// Startup: settings, collections, legacy migration, then project the
    /// active request into the buffers. Only a failure to create the storage
    /// directories is fatal; file-level problems end up in `load_report`.
    pub fn create(layout: StorageLayout) -> Result<Self> {
        layout.ensure_dirs()?;
        let settings = Settings::load(&layout.settings_path());
        let mut state = AppState::new(layout, settings);

        state.load_report = storage::load_all(&state.layout, &mut state.manager)?;
        for (path, err) in &state.load_report.errors {
            tracing::warn!(path = %path.display(), error = %err, "Collection not loaded");
        }

        match storage::run_migration(&state.layout, &mut state.manager) {
            Ok(outcome) => tracing::debug!(?outcome, "Migration check finished"),
            Err(e) => {
                tracing::warn!(error = %e, "Legacy migration failed");
                state.load_report.errors.push((state.layout.legacy_requests_path(), e));
            }
        }

        if !state.load_report.selection_restored {
            state.restore_last_active_collection();
        }
        state.collection_default_auth = state
            .manager
            .active_collection()
            .and_then(|c| c.default_auth.clone());
        state.request_dirty = true;
        state.sync_request_to_ui();

        tracing::info!(
            collections = state.manager.len(),
            requests = state.manager.total_requests(),
            "Application state created"
        );
        Ok(state)
    }

    fn restore_last_active_collection(&mut self) {
        let index = self
            .settings
            .collections
            .last_active_collection
            .as_deref()
            .and_then(|id| self.manager.find_collection_by_id(id));
        if let Some(index) = index {
            let _ = self.manager.set_active_collection(index);
        }
    }

    /// Flush pending edits and save everything.
    pub fn shutdown(&mut self) -> Result<()> {
        let result = self.save_all_collections();
        match &result {
            Ok(()) => tracing::info!("Application state saved on shutdown"),
            Err(e) => tracing::warn!(error = %e, "Save on shutdown failed"),
        }
        result
    }

    // ========================
    // Dirty bits
    // ========================

    pub fn mark_ui_dirty(&mut self) {
        self.ui_dirty = true;
    }

    pub fn mark_request_dirty(&mut self) {
        self.request_dirty = true;
    }

    pub fn is_ui_dirty(&self) -> bool {
        self.ui_dirty
    }

    pub fn is_request_dirty(&self) -> bool {
        self.request_dirty
    }

    pub fn mark_changed(&mut self) {
        self.unsaved_changes = true;
    }

    pub fn mark_saved(&mut self) {
        self.unsaved_changes = false;
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved_changes
    }

    pub fn is_request_in_progress(&self) -> bool {
        self.request_in_progress
    }

    pub fn last_ui_sync(&self) -> i64 {
        self.last_ui_sync
    }

    pub fn last_auto_save(&self) -> i64 {
        self.last_auto_save
    }

    // ========================
    // Selection
    // ========================

    pub fn active_collection(&self) -> Option<&Collection> {
        self.manager.active_collection()
    }

    pub fn active_request(&self) -> Option<&Request> {
        self.manager.active_request()
    }

    /// True when the buffers project a request stored in a collection.
    pub fn is_editing_collection_request(&self) -> bool {
        self.manager.active_request().is_some()
    }

    /// The record the buffers project: the active request, else the scratch.
    pub fn target_request(&self) -> &Request {
        match self.manager.active_request() {
            Some(request) => request,
            None => &self.current_request,
        }
    }

    pub fn target_request_mut(&mut self) -> &mut Request {
        match self.manager.active_request_mut() {
            Some(request) => request,
            None => &mut self.current_request,
        }
    }

    pub(crate) fn touch_active_collection(&mut self) {
        if let Some(collection) = self.manager.active_collection_mut() {
            collection.update_modified_time();
        }
    }

    pub fn selected_method(&self) -> &'static str {
        HTTP_METHODS
            .get(self.method_index)
            .copied()
            .unwrap_or(HTTP_METHODS[0])
    }

    /// Buffers shown when nothing is selected. Auth scratch is kept.
    pub(crate) fn clear_request_buffers(&mut self) {
        self.url_buffer.clear();
        self.method_index = 0;
        self.content.clear_all();
        self.body_kind = BodyKind::default();
        self.header_name_buffer.clear();
        self.header_value_buffer.clear();
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }
}
