//! Fatal conversion errors.
//!
//! Anything in here aborts the conversion of one screen. Node- and block-level
//! defects never end up here; they are recorded as
//! [`Diagnostic`](crate::validate::Diagnostic)s instead.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("malformed layout descriptor for screen `{screen}`: {reason}")]
    MalformedLayoutDescriptor { screen: String, reason: String },

    #[error("malformed block descriptor for screen `{screen}`: {reason}")]
    MalformedBlockDescriptor { screen: String, reason: String },

    /// Sequential suffixing makes this unreachable unless the allocator is broken.
    #[error("identifier collision on `{id}` in screen `{screen}`")]
    IdentifierCollision { screen: String, id: String },

    #[error("conversion of screen `{screen}` exceeded its deadline of {limit:?}")]
    Timeout { screen: String, limit: Duration },

    #[error("invalid component mapping table: {reason}")]
    MappingTable { reason: String },

    #[error("no screen descriptors found under {}", .path.display())]
    NoScreens { path: PathBuf },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConversionError {
    /// Screen the failure belongs to, when it is screen-scoped.
    pub fn screen(&self) -> Option<&str> {
        match self {
            ConversionError::MalformedLayoutDescriptor { screen, .. }
            | ConversionError::MalformedBlockDescriptor { screen, .. }
            | ConversionError::IdentifierCollision { screen, .. }
            | ConversionError::Timeout { screen, .. } => Some(screen),
            ConversionError::MappingTable { .. }
            | ConversionError::NoScreens { .. }
            | ConversionError::Io { .. } => None,
        }
    }
}
