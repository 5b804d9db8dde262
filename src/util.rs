//! Small helpers shared across the core: clock, bounded strings, URL splitting.

/// Seconds since the Unix epoch.
pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Truncate `s` to at most `max` bytes without splitting a UTF-8 character.
pub fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Owned variant of [`truncate_str`].
pub fn truncated(s: &str, max: usize) -> String {
    truncate_str(s, max).to_string()
}

/// Split a URL into `(host, path)`.
///
/// The host has userinfo and `:port` removed; the path excludes query and
/// fragment and defaults to `/`. URLs without a scheme are split by hand.
pub fn split_url(url: &str) -> (String, String) {
    if let Ok(parsed) = url::Url::parse(url.trim()) {
        if let Some(host) = parsed.host_str() {
            let path = match parsed.path() {
                "" => "/",
                path => path,
            };
            return (host.to_ascii_lowercase(), path.to_string());
        }
    }
    split_url_without_scheme(url)
}

fn split_url_without_scheme(url: &str) -> (String, String) {
    let rest = match url.find("://") {
        Some(pos) => &url[pos + 3..],
        None => url,
    };

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let after = &rest[authority_end..];

    let authority = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
    let host = authority.split(':').next().unwrap_or(authority);

    let path = if after.starts_with('/') {
        let end = after.find(['?', '#']).unwrap_or(after.len());
        &after[..end]
    } else {
        "/"
    };

    (host.to_ascii_lowercase(), path.to_string())
}

/// True when the URL uses a TLS scheme.
pub fn is_secure_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("wss://")
}

pub fn is_localhost(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "[::1]")
}
