//! Body editors per content type and their coupling to `Content-Type`

use crate::app::state::AppState;
use crate::constants::{FORM_BOUNDARY, MAX_REQUEST_BODY};
use crate::util::truncated;

/// Body editor selected in the UI
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BodyKind {
    #[default]
    Json,
    FormData,
    UrlEncoded,
    Xml,
    Yaml,
    PlainText,
}

impl BodyKind {
    pub const ALL: [BodyKind; 6] = [
        BodyKind::Json,
        BodyKind::FormData,
        BodyKind::UrlEncoded,
        BodyKind::Xml,
        BodyKind::Yaml,
        BodyKind::PlainText,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BodyKind::Json => "JSON",
            BodyKind::FormData => "Form Data",
            BodyKind::UrlEncoded => "URL Encoded",
            BodyKind::Xml => "XML",
            BodyKind::Yaml => "YAML",
            BodyKind::PlainText => "Plain Text",
        }
    }

    pub fn content_type(self) -> String {
        match self {
            BodyKind::Json => "application/json".to_string(),
            BodyKind::FormData => format!("multipart/form-data; boundary={}", FORM_BOUNDARY),
            BodyKind::UrlEncoded => "application/x-www-form-urlencoded".to_string(),
            BodyKind::Xml => "application/xml".to_string(),
            BodyKind::Yaml => "application/x-yaml".to_string(),
            BodyKind::PlainText => "text/plain".to_string(),
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<BodyKind> {
        let ct = content_type.to_ascii_lowercase();
        if ct.contains("json") {
            Some(BodyKind::Json)
        } else if ct.contains("multipart/form-data") {
            Some(BodyKind::FormData)
        } else if ct.contains("x-www-form-urlencoded") {
            Some(BodyKind::UrlEncoded)
        } else if ct.contains("xml") {
            Some(BodyKind::Xml)
        } else if ct.contains("yaml") || ct.contains("yml") {
            Some(BodyKind::Yaml)
        } else if ct.starts_with("text/") {
            Some(BodyKind::PlainText)
        } else {
            None
        }
    }

    /// Guess the kind of a body with no usable `Content-Type`.
    pub fn sniff(body: &str) -> BodyKind {
        let trimmed = body.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            BodyKind::Json
        } else if body.contains(FORM_BOUNDARY) || body.contains("Content-Disposition: form-data") {
            BodyKind::FormData
        } else if body.contains('=') && body.contains('&') {
            BodyKind::UrlEncoded
        } else if trimmed.starts_with('<') {
            BodyKind::Xml
        } else if body.contains(':') && body.contains('\n') {
            BodyKind::Yaml
        } else {
            BodyKind::PlainText
        }
    }

    /// Form kinds edit the shared body buffer directly.
    pub fn uses_body_buffer(self) -> bool {
        matches!(self, BodyKind::FormData | BodyKind::UrlEncoded)
    }
}

/// Four typed editors plus the shared body buffer the send path reads
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentBuffers {
    pub json: String,
    pub plain_text: String,
    pub xml: String,
    pub yaml: String,
    /// Form data, urlencoded, and the mirror of the active typed editor
    pub body: String,
}

impl ContentBuffers {
    pub fn get(&self, kind: BodyKind) -> &str {
        match kind {
            BodyKind::Json => &self.json,
            BodyKind::PlainText => &self.plain_text,
            BodyKind::Xml => &self.xml,
            BodyKind::Yaml => &self.yaml,
            BodyKind::FormData | BodyKind::UrlEncoded => &self.body,
        }
    }

    pub fn get_mut(&mut self, kind: BodyKind) -> &mut String {
        match kind {
            BodyKind::Json => &mut self.json,
            BodyKind::PlainText => &mut self.plain_text,
            BodyKind::Xml => &mut self.xml,
            BodyKind::Yaml => &mut self.yaml,
            BodyKind::FormData | BodyKind::UrlEncoded => &mut self.body,
        }
    }

    /// Copy `content` in, cut to the request body limit. Returns true when cut.
    pub fn set(&mut self, kind: BodyKind, content: &str) -> bool {
        let cut = content.len() > MAX_REQUEST_BODY;
        *self.get_mut(kind) = if cut {
            truncated(content, MAX_REQUEST_BODY)
        } else {
            content.to_string()
        };
        cut
    }

    /// Mirror a typed editor into `body`. Form kinds already live there.
    pub fn sync_to_body(&mut self, kind: BodyKind) {
        if !kind.uses_body_buffer() {
            self.body = self.get(kind).to_string();
        }
    }

    pub fn clear_typed(&mut self) {
        self.json.clear();
        self.plain_text.clear();
        self.xml.clear();
        self.yaml.clear();
    }

    pub fn clear_all(&mut self) {
        self.clear_typed();
        self.body.clear();
    }
}

// ========================
// AppState content commands
// ========================

impl AppState {
    /// Direct access for the editor widget. Call `mark_ui_dirty` after editing.
    pub fn content_buffer_mut(&mut self, kind: BodyKind) -> &mut String {
        self.content.get_mut(kind)
    }

    pub fn content_buffer(&self, kind: BodyKind) -> &str {
        self.content.get(kind)
    }

    pub fn set_content_buffer(&mut self, kind: BodyKind, content: &str) {
        if self.content.set(kind, content) {
            tracing::warn!(kind = kind.as_str(), "Body truncated to size limit");
        }
        self.mark_ui_dirty();
        if self.is_editing_collection_request() {
            self.mark_changed();
        }
    }

    pub fn sync_content_to_body_buffer(&mut self, kind: BodyKind) {
        self.content.sync_to_body(kind);
    }

    /// Clear the four typed editors. The shared body buffer is kept.
    pub fn clear_content_buffers(&mut self) {
        self.content.clear_typed();
    }

    /// Switch the body editor and rewrite `Content-Type` on the edited request.
    pub fn set_body_kind(&mut self, kind: BodyKind) {
        if self.body_kind == kind {
            return;
        }
        let outgoing = self.body_kind;
        self.content.sync_to_body(outgoing);
        self.body_kind = kind;
        self.content.sync_to_body(kind);

        let content_type = kind.content_type();
        let in_collection = self.is_editing_collection_request();
        let request = self.target_request_mut();
        if let Err(e) = request.headers.update("Content-Type", &content_type) {
            tracing::warn!(error = %e, "Could not set Content-Type");
        }
        if in_collection {
            self.touch_active_collection();
            self.mark_changed();
        }
        self.mark_ui_dirty();
        tracing::debug!(from = outgoing.as_str(), to = kind.as_str(), "Body kind changed");
    }

    /// Text the send path uses for the selected kind.
    pub fn active_body_text(&self) -> &str {
        self.content.get(self.body_kind)
    }
}
