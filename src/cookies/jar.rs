//! Per-collection cookie store with RFC 6265 style domain and path matching

use serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_COOKIES_PER_REQUEST, MAX_COOKIE_DOMAIN_LEN, MAX_COOKIE_NAME_LEN, MAX_COOKIE_PATH_LEN,
    MAX_COOKIE_VALUE_LEN,
};
use crate::error::{CoreError, Result};
use crate::util::{is_localhost, now_epoch, split_url};

fn default_path() -> String {
    String::from("/")
}

fn default_max_age() -> i64 {
    -1
}

/// `SameSite` attribute as stored in the two exclusive flags
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    Unset,
}

/// A cookie as kept in a jar and written to collection files
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Absolute epoch seconds, 0 for a session cookie
    #[serde(default)]
    pub expires: i64,
    /// Seconds relative to `created_at`, -1 when unset
    #[serde(default = "default_max_age")]
    pub max_age: i64,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub same_site_strict: bool,
    #[serde(default)]
    pub same_site_lax: bool,
    #[serde(default)]
    pub created_at: i64,
}

impl StoredCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        StoredCookie {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: default_path(),
            expires: 0,
            max_age: -1,
            secure: false,
            http_only: false,
            same_site_strict: false,
            same_site_lax: false,
            created_at: 0,
        }
    }

    pub fn same_site(&self) -> SameSite {
        if self.same_site_strict {
            SameSite::Strict
        } else if self.same_site_lax {
            SameSite::Lax
        } else {
            SameSite::Unset
        }
    }

    pub fn set_same_site(&mut self, same_site: SameSite) {
        self.same_site_strict = same_site == SameSite::Strict;
        self.same_site_lax = same_site == SameSite::Lax;
    }

    /// Session cookies (no `Expires`, no `Max-Age`) never expire by time.
    pub fn is_session(&self) -> bool {
        self.expires == 0 && self.max_age < 0
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        if self.max_age >= 0 {
            now > self.created_at.saturating_add(self.max_age)
        } else {
            self.expires > 0 && now > self.expires
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_epoch())
    }

    fn same_identity(&self, name: &str, domain: &str, path: &str) -> bool {
        self.name == name && self.domain.eq_ignore_ascii_case(domain) && self.path == path
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.len() > MAX_COOKIE_NAME_LEN {
            return Err(CoreError::BufferOverflow {
                field: "cookie name",
                max: MAX_COOKIE_NAME_LEN,
            });
        }
        if self.value.len() > MAX_COOKIE_VALUE_LEN {
            return Err(CoreError::BufferOverflow {
                field: "cookie value",
                max: MAX_COOKIE_VALUE_LEN,
            });
        }
        if self.domain.len() > MAX_COOKIE_DOMAIN_LEN {
            return Err(CoreError::BufferOverflow {
                field: "cookie domain",
                max: MAX_COOKIE_DOMAIN_LEN,
            });
        }
        if self.path.len() > MAX_COOKIE_PATH_LEN {
            return Err(CoreError::BufferOverflow {
                field: "cookie path",
                max: MAX_COOKIE_PATH_LEN,
            });
        }
        Ok(())
    }
}

/// Domain rule: a leading dot admits the domain itself and proper subdomains,
/// otherwise the host must match exactly. Empty matches any host.
pub fn domain_matches(cookie_domain: &str, host: &str) -> bool {
    if cookie_domain.is_empty() {
        return true;
    }
    match cookie_domain.strip_prefix('.') {
        Some(suffix) => {
            let suffix = suffix.to_ascii_lowercase();
            if host == suffix {
                return true;
            }
            host.len() > suffix.len()
                && host.ends_with(&suffix)
                && host.as_bytes()[host.len() - suffix.len() - 1] == b'.'
        }
        None => cookie_domain.eq_ignore_ascii_case(host),
    }
}

pub fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if !request_path.starts_with(cookie_path) {
        return false;
    }
    cookie_path.ends_with('/')
        || matches!(request_path.as_bytes().get(cookie_path.len()), None | Some(b'/'))
}

/// Ordered cookie store owned by one collection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<StoredCookie>,
    /// Send `secure` cookies over plain HTTP to localhost / 127.0.0.1
    pub allow_insecure_localhost: bool,
}

impl Default for CookieJar {
    fn default() -> Self {
        CookieJar {
            cookies: Vec::new(),
            allow_insecure_localhost: true,
        }
    }
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoredCookie> {
        self.cookies.iter()
    }

    pub fn cookies(&self) -> &[StoredCookie] {
        &self.cookies
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    pub fn find(&self, name: &str, domain: &str, path: &str) -> Option<usize> {
        let path = if path.is_empty() { "/" } else { path };
        self.cookies
            .iter()
            .position(|c| c.same_identity(name, domain, path))
    }

    pub fn remove(&mut self, index: usize) -> Result<StoredCookie> {
        if index >= self.cookies.len() {
            return Err(CoreError::invalid_index(index, self.cookies.len()));
        }
        Ok(self.cookies.remove(index))
    }

    /// Upsert by `(name, domain, path)`. Stamps `created_at` with the current time.
    pub fn add(&mut self, cookie: StoredCookie) -> Result<usize> {
        self.add_at(cookie, now_epoch())
    }

    pub fn add_at(&mut self, mut cookie: StoredCookie, now: i64) -> Result<usize> {
        cookie.created_at = now;
        self.upsert(cookie)
    }

    /// Upsert keeping the cookie's own `created_at`; used when loading from disk.
    pub fn restore(&mut self, cookie: StoredCookie) -> Result<usize> {
        self.upsert(cookie)
    }

    fn upsert(&mut self, mut cookie: StoredCookie) -> Result<usize> {
        if cookie.path.is_empty() {
            cookie.path = default_path();
        }
        cookie.domain.make_ascii_lowercase();
        if cookie.same_site_strict && cookie.same_site_lax {
            cookie.same_site_lax = false;
        }
        cookie.validate()?;

        if let Some(index) = self.find(&cookie.name, &cookie.domain, &cookie.path) {
            self.cookies[index] = cookie;
            return Ok(index);
        }
        self.cookies
            .try_reserve(1)
            .map_err(|_| CoreError::MemoryAllocation("cookie jar"))?;
        self.cookies.push(cookie);
        Ok(self.cookies.len() - 1)
    }

    pub fn matches(&self, cookie: &StoredCookie, url: &str, is_secure: bool) -> bool {
        self.matches_at(cookie, url, is_secure, now_epoch())
    }

    pub fn matches_at(&self, cookie: &StoredCookie, url: &str, is_secure: bool, now: i64) -> bool {
        if cookie.is_expired_at(now) {
            return false;
        }
        let (host, path) = split_url(url);
        if cookie.secure && !is_secure && !(self.allow_insecure_localhost && is_localhost(&host)) {
            return false;
        }
        domain_matches(&cookie.domain, &host) && path_matches(&cookie.path, &path)
    }

    /// `name1=value1; name2=value2` for every live match, or `None`.
    pub fn build_cookie_header(&self, url: &str, is_secure: bool) -> Option<String> {
        self.build_cookie_header_at(url, is_secure, now_epoch())
    }

    pub fn build_cookie_header_at(&self, url: &str, is_secure: bool, now: i64) -> Option<String> {
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|c| self.matches_at(c, url, is_secure, now))
            .take(MAX_COOKIES_PER_REQUEST)
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// Drop expired cookies, returning how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        self.cleanup_expired_at(now_epoch())
    }

    pub fn cleanup_expired_at(&mut self, now: i64) -> usize {
        let before = self.cookies.len();
        self.cookies.retain(|c| !c.is_expired_at(now));
        let removed = before - self.cookies.len();
        if removed > 0 {
            tracing::debug!(removed, "Swept expired cookies");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn cookie(name: &str, domain: &str, path: &str) -> StoredCookie {
        StoredCookie {
            domain: domain.to_string(),
            path: path.to_string(),
            ..StoredCookie::new(name, "v")
        }
    }

    fn jar_with(c: StoredCookie) -> CookieJar {
        let mut jar = CookieJar::new();
        jar.add_at(c, NOW).unwrap();
        jar
    }

    #[test]
    fn test_upsert_by_identity() {
        let mut jar = CookieJar::new();
        jar.add_at(cookie("sid", "example.com", "/"), NOW).unwrap();
        let mut updated = cookie("sid", "example.com", "/");
        updated.value = "new".into();
        updated.secure = true;
        let idx = jar.add_at(updated, NOW + 5).unwrap();
        assert_eq!(idx, 0);
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.cookies()[0].value, "new");
        assert!(jar.cookies()[0].secure);
        assert_eq!(jar.cookies()[0].created_at, NOW + 5);

        jar.add_at(cookie("sid", "example.com", "/api"), NOW).unwrap();
        assert_eq!(jar.len(), 2);
    }

    #[test]
    fn test_empty_path_defaults_to_root() {
        let jar = jar_with(cookie("a", "h", ""));
        assert_eq!(jar.cookies()[0].path, "/");
        assert_eq!(jar.find("a", "h", ""), Some(0));
    }

    #[test]
    fn test_add_rejects_invalid() {
        let mut jar = CookieJar::new();
        assert!(jar.add_at(cookie("", "h", "/"), NOW).is_err());
        let mut long = cookie("n", "h", "/");
        long.value = "v".repeat(MAX_COOKIE_VALUE_LEN + 1);
        assert!(jar.add_at(long, NOW).is_err());
        assert!(jar.is_empty());
    }

    #[test]
    fn test_expiry_predicate() {
        let mut c = cookie("a", "", "/");
        c.created_at = NOW;
        assert!(c.is_session());
        assert!(!c.is_expired_at(NOW + 1_000_000));

        c.max_age = 10;
        assert!(!c.is_expired_at(NOW + 10));
        assert!(c.is_expired_at(NOW + 11));

        c.max_age = -1;
        c.expires = NOW + 100;
        assert!(!c.is_expired_at(NOW + 100));
        assert!(c.is_expired_at(NOW + 101));
    }

    #[test]
    fn test_empty_domain_matches_any_host() {
        let jar = jar_with(cookie("a", "", "/"));
        for url in ["https://a.com/", "http://x.y.z/path", "http://localhost:8080"] {
            assert!(jar.matches_at(&jar.cookies()[0], url, true, NOW), "{}", url);
        }
    }

    #[test]
    fn test_dot_domain_matches_subdomains_only() {
        let jar = jar_with(cookie("a", ".example.com", "/"));
        let c = &jar.cookies()[0];
        assert!(jar.matches_at(c, "https://api.example.com/", true, NOW));
        assert!(jar.matches_at(c, "https://example.com/", true, NOW));
        assert!(jar.matches_at(c, "https://a.b.example.com/", true, NOW));
        assert!(!jar.matches_at(c, "https://evilexample.com/", true, NOW));
        assert!(!jar.matches_at(c, "https://example.com.evil.org/", true, NOW));
    }

    #[test]
    fn test_host_only_domain_is_exact() {
        let jar = jar_with(cookie("a", "example.com", "/"));
        let c = &jar.cookies()[0];
        assert!(jar.matches_at(c, "https://example.com/x", true, NOW));
        assert!(jar.matches_at(c, "https://EXAMPLE.com:443/x", true, NOW));
        assert!(!jar.matches_at(c, "https://api.example.com/x", true, NOW));
    }

    #[test]
    fn test_path_matching() {
        let jar = jar_with(cookie("a", "", "/a"));
        let c = &jar.cookies()[0];
        assert!(jar.matches_at(c, "http://h/a", false, NOW));
        assert!(jar.matches_at(c, "http://h/a/", false, NOW));
        assert!(jar.matches_at(c, "http://h/a/b", false, NOW));
        assert!(jar.matches_at(c, "http://h/a?x=1", false, NOW));
        assert!(!jar.matches_at(c, "http://h/ab", false, NOW));
        assert!(!jar.matches_at(c, "http://h/", false, NOW));

        let jar = jar_with(cookie("a", "", "/a/"));
        let c = &jar.cookies()[0];
        assert!(jar.matches_at(c, "http://h/a/b", false, NOW));
        assert!(!jar.matches_at(c, "http://h/a", false, NOW));
    }

    #[test]
    fn test_secure_cookie_requires_tls_except_localhost() {
        let mut c = cookie("a", "", "/");
        c.secure = true;
        let mut jar = jar_with(c);
        let c = jar.cookies()[0].clone();
        assert!(jar.matches_at(&c, "https://example.com/", true, NOW));
        assert!(!jar.matches_at(&c, "http://example.com/", false, NOW));
        assert!(jar.matches_at(&c, "http://localhost:3000/", false, NOW));
        assert!(jar.matches_at(&c, "http://127.0.0.1/", false, NOW));

        jar.allow_insecure_localhost = false;
        assert!(!jar.matches_at(&c, "http://localhost:3000/", false, NOW));
    }

    #[test]
    fn test_expired_cookie_never_matches() {
        let mut c = cookie("a", "", "/");
        c.max_age = 0;
        let jar = jar_with(c);
        assert!(!jar.matches_at(&jar.cookies()[0], "https://h/", true, NOW + 1));
    }

    #[test]
    fn test_build_cookie_header_in_insertion_order() {
        let mut jar = CookieJar::new();
        jar.add_at(StoredCookie::new("b", "2"), NOW).unwrap();
        jar.add_at(StoredCookie::new("a", "1"), NOW).unwrap();
        let mut other = StoredCookie::new("c", "3");
        other.domain = "other.org".into();
        jar.add_at(other, NOW).unwrap();

        let header = jar.build_cookie_header_at("https://example.com/", true, NOW);
        assert_eq!(header.as_deref(), Some("b=2; a=1"));
        assert_eq!(
            jar.build_cookie_header_at("https://nothing.example/", true, NOW)
                .map(|h| h.contains("c=3")),
            Some(false)
        );

        let empty = CookieJar::new();
        assert_eq!(empty.build_cookie_header_at("https://h/", true, NOW), None);
    }

    #[test]
    fn test_matching_sweep() {
        let hosts = [
            "example.com",
            "api.example.com",
            "a.b.example.com",
            "evilexample.com",
            "example.com.evil.org",
            "localhost",
            "127.0.0.1",
        ];
        let paths = ["/", "/a", "/a/", "/a/b", "/ab", "/b"];
        let domains = ["", ".example.com", "example.com", "localhost"];
        let cookie_paths = ["/", "/a", "/a/"];

        let domain_ok = |domain: &str, host: &str| {
            if domain.is_empty() {
                true
            } else if let Some(base) = domain.strip_prefix('.') {
                host == base || host.ends_with(domain)
            } else {
                host == domain
            }
        };
        let path_ok = |cookie_path: &str, path: &str| {
            path == cookie_path
                || (path.starts_with(cookie_path)
                    && (cookie_path.ends_with('/') || path[cookie_path.len()..].starts_with('/')))
        };

        let jar = CookieJar::new();
        let (mut hits, mut misses) = (0, 0);
        for host in hosts {
            for path in paths {
                for https in [false, true] {
                    let url = format!("{}://{}{}", if https { "https" } else { "http" }, host, path);
                    for domain in domains {
                        for cookie_path in cookie_paths {
                            for secure in [false, true] {
                                for expired in [false, true] {
                                    let mut c = cookie("c", domain, cookie_path);
                                    c.secure = secure;
                                    if expired {
                                        c.created_at = NOW - 100;
                                        c.max_age = 10;
                                    }
                                    let secure_ok = !secure
                                        || https
                                        || host == "localhost"
                                        || host == "127.0.0.1";
                                    let expected = !expired
                                        && secure_ok
                                        && domain_ok(domain, host)
                                        && path_ok(cookie_path, path);
                                    assert_eq!(
                                        jar.matches_at(&c, &url, https, NOW),
                                        expected,
                                        "url={} domain={:?} path={} secure={} expired={}",
                                        url,
                                        domain,
                                        cookie_path,
                                        secure,
                                        expired
                                    );
                                    if expected {
                                        hits += 1;
                                    } else {
                                        misses += 1;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        assert!(hits > 100 && misses > 100);
    }

    #[test]
    fn test_cleanup_expired() {
        let mut jar = CookieJar::new();
        let mut short = StoredCookie::new("short", "1");
        short.max_age = 5;
        let mut dated = StoredCookie::new("dated", "1");
        dated.expires = NOW + 50;
        jar.add_at(short, NOW).unwrap();
        jar.add_at(StoredCookie::new("session", "1"), NOW).unwrap();
        jar.add_at(dated, NOW).unwrap();

        assert_eq!(jar.cleanup_expired_at(NOW + 10), 1);
        assert_eq!(jar.len(), 2);
        assert_eq!(jar.cleanup_expired_at(NOW + 100), 1);
        assert_eq!(jar.cookies()[0].name, "session");
        assert!(jar.iter().all(|c| !c.is_expired_at(NOW + 100)));
    }

    #[test]
    fn test_same_site_flags_exclusive() {
        let mut c = StoredCookie::new("a", "1");
        c.set_same_site(SameSite::Strict);
        assert_eq!(c.same_site(), SameSite::Strict);
        c.set_same_site(SameSite::Lax);
        assert!(!c.same_site_strict && c.same_site_lax);
        c.same_site_strict = true;
        let jar = jar_with(c);
        assert_eq!(jar.cookies()[0].same_site(), SameSite::Strict);
    }
}
