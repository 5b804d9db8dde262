//! Application constants
//!
//! Centralized location for field bounds, file names and defaults.

/// Application name, used for the Windows storage root
pub const APP_NAME: &str = "TinyRequest";

/// Directory name under `~/.config` on non-Windows platforms
pub const APP_DIR_NAME: &str = "tinyrequest";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ========================
// Field bounds
// ========================

pub const MAX_HEADER_NAME_LEN: usize = 127;
pub const MAX_HEADER_VALUE_LEN: usize = 511;
/// Header values on the wire (cookies, Basic credentials, server headers).
/// Large enough for a `Cookie:` header carrying the per-request cookie cap.
pub const MAX_WIRE_HEADER_VALUE_LEN: usize = MAX_COOKIE_HEADER_LEN;
pub const HEADER_INITIAL_CAPACITY: usize = 4;
/// Growth guard against runaway header lists
pub const MAX_HEADERS: usize = 1000;

pub const MAX_METHOD_LEN: usize = 15;
pub const MAX_URL_LEN: usize = 2047;
pub const MAX_REQUEST_BODY: usize = 50 * 1024 * 1024;
pub const MAX_RESPONSE_BODY: usize = 100 * 1024 * 1024;
pub const MAX_CREDENTIAL_LEN: usize = 2047;

pub const MAX_COOKIE_NAME_LEN: usize = 127;
pub const MAX_COOKIE_VALUE_LEN: usize = 511;
pub const MAX_COOKIE_DOMAIN_LEN: usize = 255;
pub const MAX_COOKIE_PATH_LEN: usize = 255;
/// Upper bound on cookies emitted in one `Cookie:` header
pub const MAX_COOKIES_PER_REQUEST: usize = 256;
/// `name=value; ` for every cookie at the per-request cap
pub const MAX_COOKIE_HEADER_LEN: usize =
    MAX_COOKIES_PER_REQUEST * (MAX_COOKIE_NAME_LEN + 1 + MAX_COOKIE_VALUE_LEN + 2);
/// Used when an `Expires=` date cannot be parsed
pub const EXPIRES_FALLBACK_SECS: i64 = 3600;

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_DESCRIPTION_LEN: usize = 511;

// ========================
// Requests and bodies
// ========================

/// Method table indexed by `AppState::method_index`
pub const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

pub const DEFAULT_METHOD: &str = "GET";

/// Scheme prepended to scratch URLs that have none
pub const DEFAULT_URL_SCHEME: &str = "https://";

pub const FORM_BOUNDARY: &str = "TinyRequestFormBoundary1234567890";

/// Suffix appended by `Collection::duplicate_request`
pub const COPY_SUFFIX: &str = " (Copy)";

// ========================
// Persistence
// ========================

pub const SETTINGS_FILE: &str = "settings.json";
pub const STATE_FILE: &str = "collections_state.json";
pub const MIGRATION_MARKER_FILE: &str = "migration_completed.marker";
pub const LEGACY_REQUESTS_FILE: &str = "saved_requests.json";
pub const LEGACY_BACKUP_FILE: &str = "saved_requests_backup.json";
pub const COLLECTIONS_DIR: &str = "collections";
pub const AUTO_SAVE_DIR: &str = "auto_save";
pub const AUTO_SAVE_BACKUP_FILE: &str = "collections_backup.json";
pub const CORRUPTED_SUFFIX: &str = ".corrupted.backup";
pub const LOG_FILE: &str = "tinyrequest.log";

/// Bytes inspected by the quick validity check of a collection file
pub const VALIDATION_PEEK_LEN: usize = 255;

pub const MIGRATED_COLLECTION_NAME: &str = "Default Collection";
pub const MIGRATED_COLLECTION_DESCRIPTION: &str = "Migrated from legacy saved requests";

// ========================
// Auto-save
// ========================

pub const DEFAULT_AUTO_SAVE_INTERVAL: u64 = 300;
pub const MIN_AUTO_SAVE_INTERVAL: u64 = 30;
pub const MAX_AUTO_SAVE_INTERVAL: u64 = 3600;
