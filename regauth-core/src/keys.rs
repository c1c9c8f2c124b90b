//! Validation and normalization of credential keys.
//!
//! A key names a registry (`quay.io`), a namespace within one
//! (`quay.io/team`), or a repository (`quay.io/team/image`). Auth files may
//! additionally carry historical key shapes (scheme-prefixed URLs, the
//! docker.io aliases) which are reconciled here.

use crate::errors::{Error, Result};

/// Validates `key` and reports whether it is namespaced (contains a `/`).
///
/// Scheme prefixes and `@` are rejected outright; a `:` is only permitted in
/// the host[:port] portion, so `localhost:5000/repo` is fine while
/// `quay.io/repo:tag` is not.
pub fn validate_key(key: &str) -> Result<bool> {
    if key.starts_with("http://") || key.starts_with("https://") {
        return Err(Error::InvalidKey {
            key: key.to_string(),
            reason: "key must not contain an http[s]:// prefix",
        });
    }
    if key.contains('@') {
        return Err(Error::InvalidKey {
            key: key.to_string(),
            reason: "key must not contain a '@' character",
        });
    }
    match key.find('/') {
        Some(first_slash) => {
            if key[first_slash + 1..].contains(':') {
                return Err(Error::InvalidKey {
                    key: key.to_string(),
                    reason: "key must not contain a ':' character after host[:port]",
                });
            }
            Ok(true)
        }
        None => Ok(false),
    }
}

/// The registry portion of a key: everything before the first `/`, or the
/// whole key when there is none.
pub fn registry_of(key: &str) -> &str {
    match key.find('/') {
        Some(first_slash) => &key[..first_slash],
        None => key,
    }
}

/// Canonicalizes the docker.io aliases to the name credentials are stored
/// under; every other registry passes through unchanged.
pub fn normalize_registry(registry: &str) -> &str {
    match registry {
        "registry-1.docker.io" | "docker.io" => "index.docker.io",
        other => other,
    }
}

/// Candidate auth-file keys for a lookup, best match first: the key itself,
/// then each parent namespace down to the bare registry. For
/// `quay.io/team/image` this yields `quay.io/team/image`, `quay.io/team`,
/// `quay.io`.
pub(crate) fn candidate_keys(key: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut current = key;
    loop {
        candidates.push(current);
        match current.rfind('/') {
            Some(last_slash) => current = &current[..last_slash],
            None => break,
        }
    }
    candidates
}

/// Converts an auth-file key to a host name and canonicalizes it.
///
/// Legacy files historically used full API URLs (`https://…/v1/`) as keys,
/// and `docker login` accepted unnormalized URLs for years even in modern
/// files. A scheme prefix is stripped; if one was present, or the file is
/// legacy, everything from the first `/` on is dropped too.
pub(crate) fn normalize_file_key(file_key: &str, legacy_format: bool) -> &str {
    let stripped = file_key
        .strip_prefix("http://")
        .or_else(|| file_key.strip_prefix("https://"))
        .unwrap_or(file_key);

    let host = if legacy_format || stripped.len() != file_key.len() {
        registry_of(stripped)
    } else {
        stripped
    };

    normalize_registry(host)
}
