//! Canonical outbound request record and its embedded auth descriptor

use std::borrow::Cow;

use crate::constants::{
    DEFAULT_METHOD, MAX_CREDENTIAL_LEN, MAX_HEADER_NAME_LEN, MAX_HEADER_VALUE_LEN,
    MAX_METHOD_LEN, MAX_REQUEST_BODY, MAX_URL_LEN,
};
use crate::error::{CoreError, Result};
use crate::models::headers::HeaderList;
use crate::util::{truncate_str, truncated};

/// Authentication type. Numeric codes are the on-disk representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AuthKind {
    #[default]
    None,
    ApiKey,
    Bearer,
    Basic,
    OAuth2,
}

impl AuthKind {
    pub fn code(self) -> u8 {
        match self {
            AuthKind::None => 0,
            AuthKind::ApiKey => 1,
            AuthKind::Bearer => 2,
            AuthKind::Basic => 3,
            AuthKind::OAuth2 => 4,
        }
    }

    pub fn from_code(code: u64) -> Option<AuthKind> {
        match code {
            0 => Some(AuthKind::None),
            1 => Some(AuthKind::ApiKey),
            2 => Some(AuthKind::Bearer),
            3 => Some(AuthKind::Basic),
            4 => Some(AuthKind::OAuth2),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthKind::None => "None",
            AuthKind::ApiKey => "API Key",
            AuthKind::Bearer => "Bearer",
            AuthKind::Basic => "Basic",
            AuthKind::OAuth2 => "OAuth 2.0",
        }
    }
}

/// Where an API key is projected
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ApiKeyLocation {
    #[default]
    Header,
    Query,
}

impl ApiKeyLocation {
    pub fn code(self) -> u8 {
        match self {
            ApiKeyLocation::Header => 0,
            ApiKeyLocation::Query => 1,
        }
    }

    pub fn from_code(code: u64) -> ApiKeyLocation {
        if code == 1 {
            ApiKeyLocation::Query
        } else {
            ApiKeyLocation::Header
        }
    }
}

/// Credentials for every kind plus one enable flag per non-None kind.
/// Only `kind` is projected at send time, and only if its flag is set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestAuth {
    pub kind: AuthKind,
    pub api_key_name: String,
    pub api_key_value: String,
    pub api_key_location: ApiKeyLocation,
    pub bearer_token: String,
    pub basic_username: String,
    pub basic_password: String,
    pub oauth_token: String,
    pub api_key_enabled: bool,
    pub bearer_enabled: bool,
    pub basic_enabled: bool,
    pub oauth_enabled: bool,
}

impl Default for RequestAuth {
    fn default() -> Self {
        RequestAuth {
            kind: AuthKind::None,
            api_key_name: String::new(),
            api_key_value: String::new(),
            api_key_location: ApiKeyLocation::Header,
            bearer_token: String::new(),
            basic_username: String::new(),
            basic_password: String::new(),
            oauth_token: String::new(),
            api_key_enabled: true,
            bearer_enabled: true,
            basic_enabled: true,
            oauth_enabled: true,
        }
    }
}

impl RequestAuth {
    pub fn bearer(token: impl Into<String>) -> Self {
        RequestAuth {
            kind: AuthKind::Bearer,
            bearer_token: token.into(),
            ..Default::default()
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        RequestAuth {
            kind: AuthKind::Basic,
            basic_username: username.into(),
            basic_password: password.into(),
            ..Default::default()
        }
    }

    pub fn api_key(
        name: impl Into<String>,
        value: impl Into<String>,
        location: ApiKeyLocation,
    ) -> Self {
        RequestAuth {
            kind: AuthKind::ApiKey,
            api_key_name: name.into(),
            api_key_value: value.into(),
            api_key_location: location,
            ..Default::default()
        }
    }

    pub fn oauth2(token: impl Into<String>) -> Self {
        RequestAuth {
            kind: AuthKind::OAuth2,
            oauth_token: token.into(),
            ..Default::default()
        }
    }

    /// Enable flag of the selected kind. `None` is never enabled.
    pub fn is_enabled(&self) -> bool {
        match self.kind {
            AuthKind::None => false,
            AuthKind::ApiKey => self.api_key_enabled,
            AuthKind::Bearer => self.bearer_enabled,
            AuthKind::Basic => self.basic_enabled,
            AuthKind::OAuth2 => self.oauth_enabled,
        }
    }

    /// Truncate every credential to its documented bound.
    pub fn clamp_to_bounds(&mut self) {
        clamp(&mut self.api_key_name, MAX_HEADER_NAME_LEN);
        clamp(&mut self.api_key_value, MAX_HEADER_VALUE_LEN);
        clamp(&mut self.bearer_token, MAX_CREDENTIAL_LEN);
        clamp(&mut self.basic_username, MAX_CREDENTIAL_LEN);
        clamp(&mut self.basic_password, MAX_CREDENTIAL_LEN);
        clamp(&mut self.oauth_token, MAX_CREDENTIAL_LEN);
    }
}

fn clamp(field: &mut String, max: usize) {
    if field.len() > max {
        *field = truncated(field, max);
    }
}

fn valid_method(method: &str) -> bool {
    !method.is_empty()
        && method.len() <= MAX_METHOD_LEN
        && method.bytes().all(|b| b.is_ascii_alphabetic() || b == b'-' || b == b'_')
}

/// A single HTTP request. Owns its headers and body exclusively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    method: String,
    url: String,
    pub headers: HeaderList,
    body: Option<Vec<u8>>,
    pub auth: RequestAuth,
}

impl Default for Request {
    fn default() -> Self {
        Request {
            method: DEFAULT_METHOD.to_string(),
            url: String::new(),
            headers: HeaderList::new(),
            body: None,
            auth: RequestAuth::default(),
        }
    }
}

impl Request {
    pub fn new(method: &str, url: &str) -> Result<Self> {
        let mut request = Request::default();
        request.set_method(method)?;
        request.set_url(url)?;
        Ok(request)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn set_method(&mut self, method: &str) -> Result<()> {
        let method = method.trim();
        if !valid_method(method) {
            return Err(CoreError::BufferOverflow {
                field: "method",
                max: MAX_METHOD_LEN,
            });
        }
        self.method = method.to_ascii_uppercase();
        Ok(())
    }

    /// Used for persisted input: invalid methods fall back to GET, long ones are cut.
    pub fn set_method_lossy(&mut self, method: &str) {
        let cut = truncate_str(method.trim(), MAX_METHOD_LEN);
        if self.set_method(cut).is_err() {
            self.method = DEFAULT_METHOD.to_string();
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: &str) -> Result<()> {
        if url.len() > MAX_URL_LEN || url.contains(['\r', '\n']) {
            return Err(CoreError::BufferOverflow {
                field: "url",
                max: MAX_URL_LEN,
            });
        }
        self.url = url.to_string();
        Ok(())
    }

    pub fn set_url_lossy(&mut self, url: &str) {
        let cleaned: String = url.chars().filter(|c| *c != '\r' && *c != '\n').collect();
        self.url = truncated(&cleaned, MAX_URL_LEN);
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        self.body.as_deref().map(String::from_utf8_lossy)
    }

    /// Replace the body. An empty slice clears it.
    pub fn set_body(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > MAX_REQUEST_BODY {
            return Err(CoreError::InvalidSize {
                what: "request body",
                size: bytes.len(),
                max: MAX_REQUEST_BODY,
            });
        }
        self.body = if bytes.is_empty() {
            None
        } else {
            Some(bytes.to_vec())
        };
        Ok(())
    }

    pub fn clear_body(&mut self) {
        self.body = None;
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("Content-Type")
    }

    pub fn method_supports_body(&self) -> bool {
        method_supports_body(&self.method)
    }
}

pub fn method_supports_body(method: &str) -> bool {
    matches!(method, "POST" | "PUT" | "PATCH" | "DELETE")
}
