//! Caller-supplied configuration for the credential store.

use std::io;
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};
use crate::types::Credentials;

/// Where the store reads and writes auth files, and how lookups may
/// short-circuit. Every field is optional; defaults follow the platform
/// conventions implemented in [`crate::paths`].
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    auth_file_path: Option<PathBuf>,
    legacy_auth_file_path: Option<PathBuf>,
    implicit_root: Option<PathBuf>,
    credentials: Option<Credentials>,
    home_dir: Option<PathBuf>,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit modern-format auth file for reads and writes, instead
    /// of the default search paths.
    pub fn auth_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.auth_file_path = Some(path.into());
        self
    }

    /// Use an explicit legacy-format (`.dockercfg`) auth file. Legacy files
    /// are read-only; writes against this configuration fail.
    pub fn legacy_auth_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.legacy_auth_file_path = Some(path.into());
        self
    }

    /// Resolve the per-uid runtime auth file under this root instead of `/`.
    pub fn implicit_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.implicit_root = Some(root.into());
        self
    }

    /// Short-circuit every lookup with these credentials.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Override the home directory used by the default search paths.
    pub fn home_dir(mut self, home: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home.into());
        self
    }

    pub(crate) fn explicit_auth_file(&self) -> Option<&Path> {
        self.auth_file_path.as_deref()
    }

    pub(crate) fn explicit_legacy_auth_file(&self) -> Option<&Path> {
        self.legacy_auth_file_path.as_deref()
    }

    pub(crate) fn implicit_root_dir(&self) -> Option<&Path> {
        self.implicit_root.as_deref()
    }

    pub(crate) fn inline_credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub(crate) fn resolved_home(&self) -> Result<PathBuf> {
        if let Some(home) = &self.home_dir {
            return Ok(home.clone());
        }
        dirs::home_dir().ok_or_else(|| Error::Io {
            path: PathBuf::from("~"),
            source: io::Error::new(
                io::ErrorKind::NotFound,
                "cannot determine the home directory",
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_accumulate() {
        let config = StoreConfig::new()
            .auth_file_path("/tmp/auth.json")
            .home_dir("/home/builder")
            .credentials(Credentials::basic("user", "pw"));
        assert_eq!(
            config.explicit_auth_file(),
            Some(Path::new("/tmp/auth.json"))
        );
        assert_eq!(config.resolved_home().unwrap(), PathBuf::from("/home/builder"));
        assert_eq!(config.inline_credentials().unwrap().username, "user");
    }
}
