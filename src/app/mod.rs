//! App layer - editable state, sync protocol and editing commands
//!
//! The UI (or CLI) edits buffers on `AppState`; explicit sync calls move
//! those edits into the canonical requests held by the collection manager.

pub mod commands;
pub mod content;
pub mod state;
pub mod sync;

pub use content::{BodyKind, ContentBuffers};
pub use state::{AppState, DialogFlags};
