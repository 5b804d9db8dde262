//! Transport seam between the executor and the HTTP stack

use crate::cookies::CookieJar;
use crate::error::Result;
use crate::models::headers::HeaderLimits;
use crate::models::{Request, Response};
use crate::util::is_secure_url;

/// Sends one fully prepared request. Implementations own TLS, redirects
/// and timeouts.
pub trait Transport {
    fn send(&mut self, request: &Request) -> Result<Response>;

    /// Send with the jar's matching cookies, then store any `Set-Cookie`
    /// values from the response back into the jar.
    fn send_with_cookies(&mut self, request: &Request, jar: &mut CookieJar) -> Result<Response> {
        let url = request.url().to_string();
        let mut wire = request.clone();
        wire.headers.widen_limits(HeaderLimits::WIRE);

        if let Some(cookies) = jar.build_cookie_header(&url, is_secure_url(&url)) {
            let value = match wire.headers.get("Cookie") {
                Some(existing) if !existing.trim().is_empty() => format!("{}; {}", existing, cookies),
                _ => cookies,
            };
            wire.headers.update("Cookie", &value)?;
        }

        let response = self.send(&wire)?;

        for header in response.headers.get_all("Set-Cookie") {
            if let Err(e) = jar.parse_set_cookie(header, &url) {
                tracing::warn!(error = %e, "Ignoring Set-Cookie");
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records what it was asked to send and answers with a canned response.
    struct Recorder {
        sent: Vec<Request>,
        set_cookie: Vec<&'static str>,
    }

    impl Transport for Recorder {
        fn send(&mut self, request: &Request) -> Result<Response> {
            self.sent.push(request.clone());
            let mut response = Response::new(200);
            for value in &self.set_cookie {
                response.headers.add("Set-Cookie", value)?;
            }
            Ok(response)
        }
    }

    #[test]
    fn test_cookies_flow_through_jar() {
        let mut transport = Recorder {
            sent: Vec::new(),
            set_cookie: vec!["sid=abc; Path=/", "theme=dark"],
        };
        let mut jar = CookieJar::new();
        let req = Request::new("GET", "https://h.example/login").unwrap();

        transport.send_with_cookies(&req, &mut jar).unwrap();
        assert_eq!(jar.len(), 2);
        assert_eq!(transport.sent[0].headers.find("Cookie"), None);

        transport.set_cookie.clear();
        transport.send_with_cookies(&req, &mut jar).unwrap();
        assert_eq!(
            transport.sent[1].headers.get("Cookie"),
            Some("sid=abc; theme=dark")
        );
        assert_eq!(req.headers.find("Cookie"), None);
    }

    #[test]
    fn test_user_cookie_header_is_kept() {
        let mut transport = Recorder {
            sent: Vec::new(),
            set_cookie: Vec::new(),
        };
        let mut jar = CookieJar::new();
        jar.parse_set_cookie("a=1", "https://h/").unwrap();
        let mut req = Request::new("GET", "https://h/").unwrap();
        req.headers.add("Cookie", "manual=yes").unwrap();

        transport.send_with_cookies(&req, &mut jar).unwrap();
        assert_eq!(transport.sent[0].headers.get("Cookie"), Some("manual=yes; a=1"));
    }

    #[test]
    fn test_large_jar_still_sends() {
        let mut transport = Recorder {
            sent: Vec::new(),
            set_cookie: Vec::new(),
        };
        let mut jar = CookieJar::new();
        let value = "v".repeat(500);
        for i in 0..40 {
            jar.parse_set_cookie(&format!("c{}={}", i, value), "https://h.example/")
                .unwrap();
        }
        assert_eq!(jar.len(), 40);

        let req = Request::new("GET", "https://h.example/").unwrap();
        transport.send_with_cookies(&req, &mut jar).unwrap();
        let cookie = transport.sent[0].headers.get("Cookie").unwrap();
        assert!(cookie.len() > 16 * 1024);
        assert_eq!(cookie.split("; ").count(), 40);
        assert!(cookie.starts_with(&format!("c0={}", value)));
    }

    #[test]
    fn test_bad_set_cookie_does_not_fail_send() {
        let mut transport = Recorder {
            sent: Vec::new(),
            set_cookie: vec!["garbage", "ok=1; Domain=other.com"],
        };
        let mut jar = CookieJar::new();
        let req = Request::new("GET", "https://h/").unwrap();
        let response = transport.send_with_cookies(&req, &mut jar).unwrap();
        assert_eq!(response.status_code, 200);
        assert!(jar.is_empty());
    }
}
