//! Projects configured credentials into headers or URL parameters before send

use base64::Engine;

use crate::error::{CoreError, Result};
use crate::models::headers::HeaderLimits;
use crate::models::request::{ApiKeyLocation, AuthKind, Request, RequestAuth};

const AUTHORIZATION: &str = "Authorization";
const X_API_KEY: &str = "X-API-Key";

/// Resolves auth from a layered source: the request's own settings win,
/// the collection default applies when the request's kind is `None`.
#[derive(Clone, Debug, Default)]
pub struct AuthResolver {
    collection_default: Option<RequestAuth>,
}

impl AuthResolver {
    pub fn new(collection_default: Option<RequestAuth>) -> Self {
        AuthResolver { collection_default }
    }

    pub fn effective<'a>(&'a self, request: &'a RequestAuth) -> &'a RequestAuth {
        match (&request.kind, &self.collection_default) {
            (AuthKind::None, Some(default)) => default,
            _ => request,
        }
    }

    /// Strip stale credentials from `req`, then project the effective auth.
    ///
    /// Meant for the outgoing copy of a request: headers are widened to wire
    /// limits and query-string keys are appended to the URL.
    pub fn apply(&self, req: &mut Request) -> Result<()> {
        let auth = self.effective(&req.auth).clone();

        req.headers.remove_all(AUTHORIZATION);
        req.headers.remove_all(X_API_KEY);
        if !auth.api_key_name.is_empty() {
            req.headers.remove_all(&auth.api_key_name);
        }
        req.headers.widen_limits(HeaderLimits::WIRE);

        if auth.kind == AuthKind::None || !auth.is_enabled() {
            return Ok(());
        }

        match auth.kind {
            AuthKind::ApiKey => {
                if auth.api_key_name.is_empty() || auth.api_key_value.is_empty() {
                    return Ok(());
                }
                match auth.api_key_location {
                    ApiKeyLocation::Header => {
                        req.headers.add(&auth.api_key_name, &auth.api_key_value)?;
                    }
                    ApiKeyLocation::Query => {
                        let url = append_query_param(req.url(), &auth.api_key_name, &auth.api_key_value);
                        req.set_url(&url)?;
                    }
                }
            }
            AuthKind::Bearer => {
                if !auth.bearer_token.is_empty() {
                    req.headers
                        .add(AUTHORIZATION, &format!("Bearer {}", auth.bearer_token))?;
                }
            }
            AuthKind::Basic => {
                if !auth.basic_username.is_empty() {
                    req.headers
                        .add(AUTHORIZATION, &basic_header_value(&auth.basic_username, &auth.basic_password))?;
                }
            }
            AuthKind::OAuth2 => {
                if !auth.oauth_token.is_empty() {
                    req.headers
                        .add(AUTHORIZATION, &format!("Bearer {}", auth.oauth_token))?;
                }
            }
            AuthKind::None => {}
        }
        tracing::debug!(kind = auth.kind.as_str(), "Applied authentication");
        Ok(())
    }
}

/// Apply a request's own auth with no collection default.
pub fn apply(req: &mut Request) -> Result<()> {
    AuthResolver::default().apply(req)
}

pub fn basic_header_value(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
    format!("Basic {}", encoded)
}

/// Append `name=value` (form-encoded) to the query, keeping any fragment last.
pub fn append_query_param(url: &str, name: &str, value: &str) -> String {
    if let Ok(mut parsed) = url::Url::parse(url) {
        if !parsed.cannot_be_a_base() {
            parsed.query_pairs_mut().append_pair(name, value);
            return parsed.into();
        }
    }

    // No scheme to parse against: splice the pair in by hand
    let (base, fragment) = match url.find('#') {
        Some(pos) => (&url[..pos], &url[pos..]),
        None => (url, ""),
    };
    let separator = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };
    let pair = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(name, value)
        .finish();
    format!("{}{}{}{}", base, separator, pair, fragment)
}

impl From<base64::DecodeError> for CoreError {
    fn from(err: base64::DecodeError) -> Self {
        CoreError::InvalidHeader(format!("invalid base64 credentials: {}", err))
    }
}

/// Decode a `Basic` header value back into `(username, password)`.
pub fn decode_basic(value: &str) -> Result<(String, String)> {
    let encoded = value
        .strip_prefix("Basic ")
        .ok_or_else(|| CoreError::InvalidHeader("not a Basic credential".to_string()))?;
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
    let text = String::from_utf8_lossy(&bytes);
    let (user, pass) = text.split_once(':').unwrap_or((&text, ""));
    Ok((user.to_string(), pass.to_string()))
}
