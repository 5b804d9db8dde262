//! Cookies: per-collection [`CookieJar`] and `Set-Cookie` handling.

pub mod jar;
pub mod set_cookie;

pub use jar::{CookieJar, SameSite, StoredCookie};
pub use set_cookie::{format_set_cookie, parse_http_date, parse_set_cookie_value};
