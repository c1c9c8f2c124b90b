//! Reading, matching, and updating JSON auth files.
//!
//! Two on-disk layouts exist: the modern document (`auths` + `credHelpers`)
//! and the legacy `.dockercfg` layout whose top level *is* the `auths` map.
//! Legacy files are read-only. Updates go through a read-modify-write
//! transaction that replaces the file atomically.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::errors::{Error, Result};
use crate::helpers::{self, HelperClient};
use crate::keys;
use crate::paths::{self, AuthPath};
use crate::types::{AuthFileDoc, AuthFileEntry, Credentials};

impl AuthPath {
    /// Reads and unmarshals this file. A missing file yields an empty
    /// document; in legacy format the raw document is the `auths` map.
    pub(crate) fn parse(&self) -> Result<AuthFileDoc> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(AuthFileDoc::default())
            }
            Err(err) => {
                return Err(Error::Io {
                    path: self.path.clone(),
                    source: err,
                })
            }
        };

        if self.legacy_format {
            let auths: HashMap<String, AuthFileEntry> =
                serde_json::from_slice(&raw).map_err(|err| Error::Parse {
                    path: self.path.clone(),
                    source: err.into(),
                })?;
            return Ok(AuthFileDoc {
                auths,
                cred_helpers: HashMap::new(),
            });
        }

        serde_json::from_slice(&raw).map_err(|err| Error::Parse {
            path: self.path.clone(),
            source: err.into(),
        })
    }
}

/// Read-modify-write transaction against the primary (modern) auth file.
///
/// The editor returns whether the document changed together with an optional
/// human-readable description of the updated location; when the description
/// is empty the file path is used. A dirty document is re-serialized with
/// tab indentation and atomically renamed into place with mode `0600`.
pub(crate) fn modify_auth_file<F>(config: &StoreConfig, editor: F) -> Result<String>
where
    F: FnOnce(&mut AuthFileDoc) -> Result<(bool, String)>,
{
    let home = config.resolved_home()?;
    let (auth_path, _) = paths::primary_auth_path(config, std::env::consts::OS, &home)?;
    if auth_path.legacy_format {
        return Err(Error::LegacyWrite {
            path: auth_path.path,
        });
    }

    let dir = auth_path.path.parent().ok_or_else(|| Error::Io {
        path: auth_path.path.clone(),
        source: io::Error::new(
            io::ErrorKind::InvalidInput,
            "auth file path has no parent directory",
        ),
    })?;
    ensure_private_dir(dir).map_err(|err| Error::Io {
        path: dir.to_path_buf(),
        source: err,
    })?;

    let mut doc = auth_path.parse()?;
    let (dirty, description) = editor(&mut doc)?;
    if dirty {
        write_atomic(&auth_path.path, dir, &doc)?;
        debug!(path = %auth_path.path.display(), "auth file updated");
    }

    if description.is_empty() {
        Ok(auth_path.path.display().to_string())
    } else {
        Ok(description)
    }
}

/// Creates `dir` (and any missing parents) with mode `0700`.
fn ensure_private_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

/// Serializes `doc` and replaces `path` via a temp file in the same
/// directory, fsynced before the rename so readers never observe a partial
/// write. `NamedTempFile` is created with mode `0600` on Unix.
fn write_atomic(path: &Path, dir: &Path, doc: &AuthFileDoc) -> Result<()> {
    let mut data = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut data, formatter);
    doc.serialize(&mut serializer).map_err(|err| Error::Parse {
        path: path.to_path_buf(),
        source: err.into(),
    })?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|err| Error::Io {
        path: path.to_path_buf(),
        source: err,
    })?;
    tmp.write_all(&data)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|err| Error::Io {
            path: path.to_path_buf(),
            source: err,
        })?;
    tmp.persist(path).map_err(|err| Error::Io {
        path: path.to_path_buf(),
        source: err.error,
    })?;
    Ok(())
}

/// Looks for credentials matching `key` (a registry, or a namespace under
/// `registry`) in one auth file.
pub(crate) fn find_credentials_in_file(
    key: &str,
    registry: &str,
    auth_path: &AuthPath,
    client: &dyn HelperClient,
) -> Result<Option<Credentials>> {
    let doc = auth_path.parse()?;

    // credHelpers entries are always registry-scoped; helpers do not accept
    // namespaced keys, so the registry is the lookup key here. The helper's
    // answer is final, even when it is a miss.
    if let Some(helper) = doc.cred_helpers.get(registry) {
        debug!(
            helper = helper.as_str(),
            registry,
            path = %auth_path.path.display(),
            "delegating lookup to credential helper from credHelpers entry"
        );
        return helpers::get_from_helper(client, helper, registry);
    }

    // Namespace keys are exact matches only; registry keys also prefer an
    // exact match. Legacy files hold registry-level entries exclusively.
    let candidates: Vec<&str> = if auth_path.legacy_format {
        vec![registry]
    } else {
        keys::candidate_keys(key)
    };
    for candidate in candidates {
        if let Some(entry) = doc.auths.get(candidate) {
            return decode_auth_entry(&auth_path.path, candidate, entry);
        }
    }

    // Normalization pass: legacy files historically used API URLs as keys,
    // and docker.io still stores under its /v1/ URL with a distinct host.
    let normalized = keys::normalize_registry(registry);
    for (file_key, entry) in &doc.auths {
        if keys::normalize_file_key(file_key, auth_path.legacy_format) == normalized {
            return decode_auth_entry(&auth_path.path, file_key, entry);
        }
    }

    debug!(key, path = %auth_path.path.display(), "no credentials matched");
    Ok(None)
}

/// Decodes one `auths` entry. The blob is base64 over `user:password`; a
/// missing separator in a non-empty blob is malformed (warned about, without
/// the payload), an empty blob is a benign helper placeholder, and either
/// way the entry yields no credentials.
fn decode_auth_entry(
    path: &Path,
    file_key: &str,
    entry: &AuthFileEntry,
) -> Result<Option<Credentials>> {
    let decoded = STANDARD.decode(&entry.auth).map_err(|err| Error::Parse {
        path: path.to_path_buf(),
        source: err.into(),
    })?;

    let Some(colon) = decoded.iter().position(|&byte| byte == b':') else {
        if decoded.is_empty() {
            debug!(
                key = file_key,
                path = %path.display(),
                "empty credential entry (credential helper placeholder?), moving on"
            );
        } else {
            warn!(
                key = file_key,
                path = %path.display(),
                "malformed auth entry: missing ':' separator"
            );
        }
        return Ok(None);
    };

    let username = String::from_utf8_lossy(&decoded[..colon]).into_owned();
    let mut password_bytes = &decoded[colon + 1..];
    while let [rest @ .., 0] = password_bytes {
        password_bytes = rest;
    }

    Ok(Some(Credentials {
        username,
        password: String::from_utf8_lossy(password_bytes).into_owned(),
        identity_token: entry.identity_token.clone(),
    }))
}
