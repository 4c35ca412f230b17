//! Document management.
//!
//! This module handles snapshots, versioning, and incremental changes.

mod snapshot;
mod store;

pub use snapshot::*;
pub use store::*;

use thiserror::Error;

/// How a source document is projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Component with a script prologue and markup.
    Template,
    /// Content entry whose frontmatter is data checked against a schema.
    Content,
}

/// Caller contract breaches on the per-document state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    #[error("document `{0}` is not open")]
    NotOpen(String),
    #[error("document `{0}` was closed")]
    Closed(String),
    #[error("document `{0}` is already open")]
    AlreadyOpen(String),
    #[error("stale update for `{id}`: version {received} is not newer than {current}")]
    StaleVersion {
        id: String,
        current: i32,
        received: i32,
    },
}
