//! Network layer - request execution
//!
//! [`HttpExecutor`] runs the send pipeline against any [`Transport`];
//! [`ReqwestTransport`] is the real HTTP stack.

pub mod client;
pub mod executor;
pub mod transport;

pub use client::ReqwestTransport;
pub use executor::{HttpExecutor, SendOutcome};
pub use transport::Transport;
