//! `Set-Cookie` parsing and formatting

use chrono::{DateTime, NaiveDateTime};

use crate::constants::EXPIRES_FALLBACK_SECS;
use crate::cookies::jar::{domain_matches, CookieJar, SameSite, StoredCookie};
use crate::error::{CoreError, Result};
use crate::util::{now_epoch, split_url};

const HTTP_DATE_FORMATS: &[&str] = &[
    // IMF-fixdate without the weekday check rfc2822 performs
    "%a, %d %b %Y %H:%M:%S GMT",
    // RFC 850
    "%A, %d-%b-%y %H:%M:%S GMT",
    // Netscape cookie style
    "%a, %d-%b-%Y %H:%M:%S GMT",
    // asctime
    "%a %b %e %H:%M:%S %Y",
];

/// Parse an HTTP date (IMF-fixdate, RFC 850 or asctime) into epoch seconds.
pub fn parse_http_date(input: &str) -> Option<i64> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.timestamp());
    }
    HTTP_DATE_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(input, format)
            .ok()
            .map(|naive| naive.and_utc().timestamp())
    })
}

/// IMF-fixdate rendering of an epoch timestamp.
pub fn format_http_date(epoch: i64) -> String {
    DateTime::from_timestamp(epoch, 0)
        .map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
        .unwrap_or_default()
}

/// Parse one `Set-Cookie` value received for `url` into a cookie.
///
/// A `Domain` attribute is stored with a leading dot (subdomains match);
/// without it the cookie is host-only. `created_at` is left at `now`.
pub fn parse_set_cookie_value(header: &str, url: &str, now: i64) -> Result<StoredCookie> {
    let mut segments = header.split(';');
    let first = segments.next().unwrap_or("");
    let (name, value) = first
        .split_once('=')
        .ok_or_else(|| CoreError::InvalidHeader(format!("Set-Cookie without '=': {:?}", first)))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::InvalidHeader("Set-Cookie with empty name".to_string()));
    }

    let (host, _) = split_url(url);
    let mut cookie = StoredCookie::new(name, value.trim());
    cookie.created_at = now;
    let mut domain_attr: Option<String> = None;

    for segment in segments {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (key, val) = match segment.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (segment, ""),
        };

        if key.eq_ignore_ascii_case("domain") {
            let bare = val.trim_start_matches('.').to_ascii_lowercase();
            if !bare.is_empty() {
                domain_attr = Some(bare);
            }
        } else if key.eq_ignore_ascii_case("path") {
            if val.starts_with('/') {
                cookie.path = val.to_string();
            }
        } else if key.eq_ignore_ascii_case("max-age") {
            match val.parse::<i64>() {
                // zero and negative both mean "expire now"
                Ok(secs) => cookie.max_age = secs.max(0),
                Err(_) => tracing::debug!(value = val, "Ignoring malformed Max-Age"),
            }
        } else if key.eq_ignore_ascii_case("expires") {
            cookie.expires = match parse_http_date(val) {
                // 0 would read as a session cookie
                Some(ts) => ts.max(1),
                None => {
                    tracing::debug!(value = val, "Unparseable Expires, using fallback lifetime");
                    now + EXPIRES_FALLBACK_SECS
                }
            };
        } else if key.eq_ignore_ascii_case("secure") {
            cookie.secure = true;
        } else if key.eq_ignore_ascii_case("httponly") {
            cookie.http_only = true;
        } else if key.eq_ignore_ascii_case("samesite") {
            let same_site = if val.eq_ignore_ascii_case("strict") {
                SameSite::Strict
            } else if val.eq_ignore_ascii_case("lax") {
                SameSite::Lax
            } else {
                SameSite::Unset
            };
            cookie.set_same_site(same_site);
        }
    }

    cookie.domain = match domain_attr {
        Some(bare) => {
            let dotted = format!(".{}", bare);
            if !domain_matches(&dotted, &host) {
                return Err(CoreError::InvalidHeader(format!(
                    "cookie domain {} does not cover host {}",
                    bare, host
                )));
            }
            dotted
        }
        None => host,
    };

    Ok(cookie)
}

/// Render a cookie back into a `Set-Cookie` value.
pub fn format_set_cookie(cookie: &StoredCookie) -> String {
    let mut parts = vec![format!("{}={}", cookie.name, cookie.value)];
    if let Some(bare) = cookie.domain.strip_prefix('.') {
        parts.push(format!("Domain={}", bare));
    }
    parts.push(format!("Path={}", cookie.path));
    if cookie.max_age >= 0 {
        parts.push(format!("Max-Age={}", cookie.max_age));
    }
    if cookie.expires > 0 {
        parts.push(format!("Expires={}", format_http_date(cookie.expires)));
    }
    if cookie.secure {
        parts.push("Secure".to_string());
    }
    if cookie.http_only {
        parts.push("HttpOnly".to_string());
    }
    match cookie.same_site() {
        SameSite::Strict => parts.push("SameSite=Strict".to_string()),
        SameSite::Lax => parts.push("SameSite=Lax".to_string()),
        SameSite::Unset => {}
    }
    parts.join("; ")
}

impl CookieJar {
    /// Ingest a `Set-Cookie` value received for `url`.
    ///
    /// Returns the jar index of the stored cookie, or `None` when the header
    /// deleted a cookie (`Max-Age<=0` or an `Expires` in the past).
    pub fn parse_set_cookie(&mut self, header: &str, url: &str) -> Result<Option<usize>> {
        self.parse_set_cookie_at(header, url, now_epoch())
    }

    pub fn parse_set_cookie_at(&mut self, header: &str, url: &str, now: i64) -> Result<Option<usize>> {
        let cookie = parse_set_cookie_value(header, url, now)?;

        let deletes = cookie.max_age == 0
            || (cookie.max_age < 0 && cookie.expires > 0 && cookie.expires < now);
        if deletes {
            if let Some(index) = self.find(&cookie.name, &cookie.domain, &cookie.path) {
                self.remove(index)?;
                tracing::debug!(name = %cookie.name, domain = %cookie.domain, "Cookie deleted by server");
            }
            return Ok(None);
        }

        self.add_at(cookie, now).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_parse_basic_cookie() {
        let c = parse_set_cookie_value(
            " sid = abc ; Domain=example.com; Path=/; Secure; HttpOnly; SameSite=Lax",
            "https://api.example.com/login",
            NOW,
        )
        .unwrap();
        assert_eq!(c.name, "sid");
        assert_eq!(c.value, "abc");
        assert_eq!(c.domain, ".example.com");
        assert_eq!(c.path, "/");
        assert!(c.secure);
        assert!(c.http_only);
        assert_eq!(c.same_site(), SameSite::Lax);
        assert_eq!(c.max_age, -1);
        assert_eq!(c.expires, 0);
    }

    #[test]
    fn test_defaults_derived_from_url() {
        let c = parse_set_cookie_value("a=1", "http://Host.Example:8080/deep/path", NOW).unwrap();
        assert_eq!(c.domain, "host.example");
        assert_eq!(c.path, "/");
        assert!(c.is_session());
    }

    #[test]
    fn test_attribute_keys_case_insensitive() {
        let c = parse_set_cookie_value(
            "a=1; DOMAIN=.h.com; path=/x; max-age=60; SECURE; httponly; samesite=strict",
            "https://h.com/",
            NOW,
        )
        .unwrap();
        assert_eq!(c.domain, ".h.com");
        assert_eq!(c.path, "/x");
        assert_eq!(c.max_age, 60);
        assert!(c.secure && c.http_only);
        assert_eq!(c.same_site(), SameSite::Strict);
    }

    #[test]
    fn test_expires_parses_http_dates() {
        let imf = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(imf, 784111777);
        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), Some(imf));
        assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994"), Some(imf));
        assert_eq!(parse_http_date("Sun, 06-Nov-1994 08:49:37 GMT"), Some(imf));
        assert_eq!(parse_http_date("not a date"), None);
    }

    #[test]
    fn test_unparseable_expires_falls_back() {
        let c = parse_set_cookie_value("a=1; Expires=whenever", "https://h/", NOW).unwrap();
        assert_eq!(c.expires, NOW + EXPIRES_FALLBACK_SECS);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse_set_cookie_value("novalue", "https://h/", NOW).is_err());
        assert!(parse_set_cookie_value("=v", "https://h/", NOW).is_err());
    }

    #[test]
    fn test_rejects_foreign_domain() {
        let err = parse_set_cookie_value("a=1; Domain=evil.com", "https://example.com/", NOW);
        assert!(err.is_err());
    }

    #[test]
    fn test_jar_ingest_and_delete() {
        let mut jar = CookieJar::new();
        let idx = jar
            .parse_set_cookie_at("sid=abc; Path=/", "https://h.com/", NOW)
            .unwrap();
        assert_eq!(idx, Some(0));
        assert_eq!(jar.len(), 1);

        let gone = jar
            .parse_set_cookie_at("sid=; Path=/; Max-Age=0", "https://h.com/", NOW)
            .unwrap();
        assert_eq!(gone, None);
        assert!(jar.is_empty());

        jar.parse_set_cookie_at("x=1", "https://h.com/", NOW).unwrap();
        jar.parse_set_cookie_at("x=1; Expires=Thu, 01 Jan 1998 00:00:00 GMT", "https://h.com/", NOW)
            .unwrap();
        assert!(jar.is_empty());
    }

    #[test]
    fn test_format_parse_round_trip() {
        let url = "https://api.example.com/v1";
        let mut original = StoredCookie::new("token", "xyz");
        original.domain = ".example.com".into();
        original.path = "/v1".into();
        original.secure = true;
        original.http_only = true;
        original.set_same_site(SameSite::Strict);
        original.created_at = NOW;

        let parsed = parse_set_cookie_value(&format_set_cookie(&original), url, NOW).unwrap();
        assert_eq!(parsed, original);

        let mut host_only = StoredCookie::new("h", "1");
        host_only.domain = "api.example.com".into();
        host_only.created_at = NOW;
        let parsed = parse_set_cookie_value(&format_set_cookie(&host_only), url, NOW).unwrap();
        assert_eq!(parsed, host_only);
    }

    #[test]
    fn test_header_replay_is_idempotent() {
        let url = "https://example.com/";
        let mut jar = CookieJar::new();
        jar.parse_set_cookie_at("a=1; Path=/", url, NOW).unwrap();
        let first = jar.build_cookie_header_at(url, true, NOW);
        jar.parse_set_cookie_at("a=1; Path=/", url, NOW).unwrap();
        assert_eq!(jar.build_cookie_header_at(url, true, NOW), first);
        assert_eq!(first.as_deref(), Some("a=1"));
    }
}
