//! Domain model: headers, requests, responses, collections and their manager.

pub mod collection;
pub mod headers;
pub mod manager;
pub mod request;
pub mod response;

pub use collection::{Collection, NamedRequest};
pub use headers::{Header, HeaderLimits, HeaderList};
pub use manager::CollectionManager;
pub use request::{ApiKeyLocation, AuthKind, Request, RequestAuth};
pub use response::Response;
