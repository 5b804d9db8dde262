//! Per-collection JSON files: schema, validation, save and load.
//!
//! The schema is the compatibility surface. Readers accept missing
//! `headers[].enabled`, `auth`, `cookies` and `auth.*_enabled`, and a body
//! `content` that is either a string or inline JSON.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::constants::{DEFAULT_METHOD, VALIDATION_PEEK_LEN};
use crate::cookies::StoredCookie;
use crate::error::{CoreError, Result};
use crate::models::collection::generate_collection_id;
use crate::models::request::{ApiKeyLocation, AuthKind, Request, RequestAuth};
use crate::models::Collection;
use crate::storage::layout::{copy_file, corrupted_backup_path, read_file, write_atomic};
use crate::util::now_epoch;

fn default_true() -> bool {
    true
}

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

// ========================
// Schema
// ========================

/// `auth` object shared by collections and requests. Only the fields of the
/// selected kind are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AuthRecord {
    #[serde(rename = "type", default)]
    kind: u64,
    #[serde(default = "default_true")]
    api_key_enabled: bool,
    #[serde(default = "default_true")]
    bearer_enabled: bool,
    #[serde(default = "default_true")]
    basic_enabled: bool,
    #[serde(default = "default_true")]
    oauth_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key_location: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bearer_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    basic_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    basic_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    oauth_token: Option<String>,
}

impl From<&RequestAuth> for AuthRecord {
    fn from(auth: &RequestAuth) -> Self {
        let mut record = AuthRecord {
            kind: auth.kind.code() as u64,
            api_key_enabled: auth.api_key_enabled,
            bearer_enabled: auth.bearer_enabled,
            basic_enabled: auth.basic_enabled,
            oauth_enabled: auth.oauth_enabled,
            api_key_name: None,
            api_key_value: None,
            api_key_location: None,
            bearer_token: None,
            basic_username: None,
            basic_password: None,
            oauth_token: None,
        };
        match auth.kind {
            AuthKind::None => {}
            AuthKind::ApiKey => {
                record.api_key_name = Some(auth.api_key_name.clone());
                record.api_key_value = Some(auth.api_key_value.clone());
                record.api_key_location = Some(auth.api_key_location.code() as u64);
            }
            AuthKind::Bearer => record.bearer_token = Some(auth.bearer_token.clone()),
            AuthKind::Basic => {
                record.basic_username = Some(auth.basic_username.clone());
                record.basic_password = Some(auth.basic_password.clone());
            }
            AuthKind::OAuth2 => record.oauth_token = Some(auth.oauth_token.clone()),
        }
        record
    }
}

impl AuthRecord {
    pub(crate) fn into_auth(self) -> RequestAuth {
        let kind = AuthKind::from_code(self.kind).unwrap_or_else(|| {
            tracing::warn!(code = self.kind, "Unknown auth type, treating as None");
            AuthKind::None
        });
        let mut auth = RequestAuth {
            kind,
            api_key_name: self.api_key_name.unwrap_or_default(),
            api_key_value: self.api_key_value.unwrap_or_default(),
            api_key_location: ApiKeyLocation::from_code(self.api_key_location.unwrap_or(0)),
            bearer_token: self.bearer_token.unwrap_or_default(),
            basic_username: self.basic_username.unwrap_or_default(),
            basic_password: self.basic_password.unwrap_or_default(),
            oauth_token: self.oauth_token.unwrap_or_default(),
            api_key_enabled: self.api_key_enabled,
            bearer_enabled: self.bearer_enabled,
            basic_enabled: self.basic_enabled,
            oauth_enabled: self.oauth_enabled,
        };
        auth.clamp_to_bounds();
        auth
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct HeaderRecord {
    name: String,
    #[serde(default)]
    value: String,
    #[serde(default = "default_true")]
    enabled: bool,
}

/// One request as stored in a collection file or the legacy request list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RequestRecord {
    #[serde(default)]
    name: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    headers: Vec<HeaderRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth: Option<AuthRecord>,
}

impl RequestRecord {
    pub(crate) fn from_request(name: &str, request: &Request) -> Self {
        RequestRecord {
            name: name.to_string(),
            method: request.method().to_string(),
            url: request.url().to_string(),
            headers: request
                .headers
                .iter()
                .map(|h| HeaderRecord {
                    name: h.name.clone(),
                    value: h.value.clone(),
                    enabled: true,
                })
                .collect(),
            body: request.body().map(body_to_json),
            auth: Some(AuthRecord::from(&request.auth)),
        }
    }

    /// Rebuild a request, dropping disabled or invalid headers.
    pub(crate) fn into_request(self) -> (String, Request) {
        let mut request = Request::default();
        request.set_method_lossy(&self.method);
        request.set_url_lossy(&self.url);

        for header in self.headers.into_iter().filter(|h| h.enabled) {
            if let Err(e) = request.headers.add(&header.name, &header.value) {
                tracing::warn!(header = %header.name, error = %e, "Skipping stored header");
            }
        }

        if let Some(text) = self.body.as_ref().and_then(body_from_json) {
            if let Err(e) = request.set_body(text.as_bytes()) {
                tracing::warn!(error = %e, "Skipping stored body");
            }
        }

        if let Some(auth) = self.auth {
            request.auth = auth.into_auth();
        }
        (self.name, request)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CollectionRecord {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    modified_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth: Option<AuthRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    cookies: Vec<StoredCookie>,
    #[serde(default)]
    requests: Vec<RequestRecord>,
}

impl From<&Collection> for CollectionRecord {
    fn from(collection: &Collection) -> Self {
        CollectionRecord {
            id: collection.id.clone(),
            name: collection.name().to_string(),
            description: collection.description().to_string(),
            created_at: collection.created_at,
            modified_at: collection.modified_at,
            auth: collection.default_auth.as_ref().map(AuthRecord::from),
            cookies: collection.cookie_jar.cookies().to_vec(),
            requests: collection
                .entries()
                .iter()
                .map(|e| RequestRecord::from_request(&e.name, &e.request))
                .collect(),
        }
    }
}

impl CollectionRecord {
    fn into_collection(self, path: &Path) -> Collection {
        let id = if !self.id.is_empty() {
            self.id
        } else {
            path.file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(generate_collection_id)
        };
        let created_at = if self.created_at > 0 {
            self.created_at
        } else {
            now_epoch()
        };

        let mut collection =
            Collection::from_persisted(&id, &self.name, &self.description, created_at, self.modified_at);
        collection.default_auth = self.auth.map(AuthRecord::into_auth);

        for record in self.requests {
            let (name, request) = record.into_request();
            collection.push_persisted(request, &name);
        }
        for cookie in self.cookies {
            if let Err(e) = collection.cookie_jar.restore(cookie) {
                tracing::warn!(collection = %id, error = %e, "Skipping stored cookie");
            }
        }
        collection
    }
}

// ========================
// Body content
// ========================

/// Embed the body as JSON only when that reproduces it exactly on load.
fn body_to_json(bytes: &[u8]) -> Value {
    let text = String::from_utf8_lossy(bytes);
    let content = match serde_json::from_str::<Value>(&text) {
        Ok(value @ (Value::Object(_) | Value::Array(_)))
            if serde_json::to_string_pretty(&value).is_ok_and(|pretty| pretty == text) =>
        {
            value
        }
        _ => Value::String(text.into_owned()),
    };
    json!({ "type": "raw", "content": content })
}

fn body_from_json(body: &Value) -> Option<String> {
    let content = match body {
        Value::Object(map) => map.get("content")?,
        // older files stored the body as a bare string
        other => other,
    };
    match content {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(_) | Value::Array(_) => serde_json::to_string_pretty(content).ok(),
        other => Some(other.to_string()),
    }
}

// ========================
// Files
// ========================

/// Cheap pre-parse check: the first non-whitespace byte within the first
/// few hundred bytes must open a JSON object or array.
pub fn validate_collection_file(path: &Path) -> Result<()> {
    let file = File::open(path).map_err(|e| CoreError::from_io(path, e))?;
    let mut peek = Vec::with_capacity(VALIDATION_PEEK_LEN);
    file.take(VALIDATION_PEEK_LEN as u64)
        .read_to_end(&mut peek)
        .map_err(|e| CoreError::from_io(path, e))?;

    match peek.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') | Some(b'[') => Ok(()),
        Some(other) => Err(CoreError::InvalidJson {
            path: path.to_path_buf(),
            reason: format!("unexpected leading byte {:?}", *other as char),
        }),
        None if peek.is_empty() => Err(CoreError::CorruptedData {
            path: path.to_path_buf(),
            reason: "file is empty".to_string(),
        }),
        None => Err(CoreError::CorruptedData {
            path: path.to_path_buf(),
            reason: "file contains only whitespace".to_string(),
        }),
    }
}

/// Serialize the whole document first; nothing is written if that fails.
pub fn save_collection(collection: &Collection, path: &Path) -> Result<()> {
    let record = CollectionRecord::from(collection);
    let bytes = serde_json::to_vec_pretty(&record).map_err(|e| CoreError::InvalidJson {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    write_atomic(path, &bytes)?;
    tracing::debug!(collection = %collection.id, path = %path.display(), "Saved collection");
    Ok(())
}

/// Load one collection file. Corrupt files are backed up before the error
/// is returned.
pub fn load_collection(path: &Path) -> Result<Collection> {
    validate_collection_file(path)
        .and_then(|()| parse_collection(path))
        .map_err(|e| handle_corrupted_file(path, "load collection", e))
}

fn parse_collection(path: &Path) -> Result<Collection> {
    let bytes = read_file(path)?;
    let record: CollectionRecord =
        serde_json::from_slice(&bytes).map_err(|e| CoreError::InvalidJson {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(record.into_collection(path))
}

/// Copy a corrupt file to `<path>.corrupted.backup` and report it as
/// `CorruptedData`. Other errors pass through. The original is never removed.
pub fn handle_corrupted_file(path: &Path, operation: &str, err: CoreError) -> CoreError {
    if !err.is_corruption() {
        return err;
    }
    let backup = corrupted_backup_path(path);
    match copy_file(path, &backup) {
        Ok(()) => tracing::warn!(
            operation,
            path = %path.display(),
            backup = %backup.display(),
            error = %err,
            "Corrupted file backed up"
        ),
        Err(copy_err) => tracing::warn!(
            operation,
            path = %path.display(),
            error = %copy_err,
            "Could not back up corrupted file"
        ),
    }
    let reason = match err {
        CoreError::InvalidJson { reason, .. } | CoreError::CorruptedData { reason, .. } => reason,
        other => other.to_string(),
    };
    CoreError::CorruptedData {
        path: path.to_path_buf(),
        reason,
    }
}
