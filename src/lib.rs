//! # TinyRequest core
//!
//! Headless core of a desktop HTTP request composer, similar to Postman/Insomnia.
//!
//! ## Features
//! - Named requests grouped into collections, one JSON file per collection
//! - Bounded header lists with case-insensitive lookup
//! - Per-collection cookie jars fed by `Set-Cookie`
//! - Auth projection: API key, Bearer, Basic, OAuth2 token
//! - Typed body buffers (JSON, form data, URL-encoded, XML, YAML, text)
//! - Auto-save, corruption backups and legacy migration
//!
//! ## Architecture
//! - Models - headers, requests, responses, collections
//! - App Layer - editable buffers and the sync protocol over the models
//! - Network Layer - send pipeline over a pluggable [`Transport`]
//! - Storage - JSON persistence under the user's config directory

pub mod app;
pub mod auth;
pub mod constants;
pub mod cookies;
pub mod error;
pub mod models;
pub mod network;
pub mod storage;
pub mod util;

// Re-export commonly used types
pub use app::{AppState, BodyKind};
pub use auth::AuthResolver;
pub use cookies::CookieJar;
pub use error::{CoreError, ErrorKind, Result};
pub use models::{
    ApiKeyLocation, AuthKind, Collection, CollectionManager, Header, HeaderList, Request,
    RequestAuth, Response,
};
pub use network::{HttpExecutor, ReqwestTransport, SendOutcome, Transport};
pub use storage::{Settings, StorageLayout};
