//! Error types shared across the credential store.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::helpers::HelperError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced by credential-store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller-supplied key failed validation.
    #[error("invalid key {key}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// A namespaced key was routed to a helper that only accepts registries.
    #[error("namespaced key is not supported for credential helper {helper}")]
    UnsupportedNamespace { helper: String },

    /// A write was attempted against a legacy-format auth file.
    #[error("writes to {} using legacy format are not supported", .path.display())]
    LegacyWrite { path: PathBuf },

    /// An auth file (or one of its entries) could not be decoded.
    #[error("parsing auth file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A filesystem operation failed.
    #[error("accessing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external credential helper failed.
    #[error(transparent)]
    Helper(#[from] HelperError),

    /// A removal found nothing to delete in any backend.
    #[error("not logged in")]
    NotLoggedIn,

    /// The stored credential cannot be represented by the requested API.
    #[error("not supported")]
    NotSupported,

    /// Several backends failed independently.
    #[error(transparent)]
    Aggregate(Aggregate),
}

/// Accumulator for fan-out operations that must attempt every backend and
/// report every failure.
#[derive(Debug, Default)]
pub struct Aggregate(Vec<Error>);

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: Error) {
        self.0.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[Error] {
        &self.0
    }

    /// Collapses the accumulator: nothing collected yields `None`, a single
    /// error is returned as itself, anything more becomes an aggregate.
    pub fn into_error(mut self) -> Option<Error> {
        match self.0.len() {
            0 => None,
            1 => Some(self.0.remove(0)),
            _ => Some(Error::Aggregate(self)),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors occurred:", self.0.len())?;
        for err in &self.0 {
            write!(f, " [{err}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for Aggregate {}
