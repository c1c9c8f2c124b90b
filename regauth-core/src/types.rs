//! Domain types: credential records, the auth-file document model, and the
//! helper-chain sum type.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Authentication material for one registry, namespace, or repository.
///
/// A record carries either a username/password pair or an OAuth2 identity
/// token; the two are mutually exclusive in practice, although a file entry
/// may store an `identitytoken` alongside the basic pair and both are
/// retained on decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub identity_token: Option<String>,
}

impl Credentials {
    /// A username/password record.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            identity_token: None,
        }
    }

    /// An identity-token record.
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            identity_token: Some(token.into()),
        }
    }
}

/// One entry of the `auths` map: a base64-encoded `user:password` blob and an
/// optional identity token. The `auth` blob may legitimately be empty; some
/// credential helpers leave placeholder entries behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthFileEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth: String,
    #[serde(
        rename = "identitytoken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub identity_token: Option<String>,
}

/// The modern auth-file document (`auth.json`, `~/.docker/config.json`).
///
/// Legacy `.dockercfg` files carry the `auths` map as their top level; they
/// are parsed into this same document with an empty `credHelpers` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthFileDoc {
    #[serde(default)]
    pub auths: HashMap<String, AuthFileEntry>,
    #[serde(rename = "credHelpers", default)]
    pub cred_helpers: HashMap<String, String>,
}

/// One step of the credential-helper chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CredentialHelper {
    /// The built-in JSON auth-file backend.
    AuthFile,
    /// An external `docker-credential-<name>` program, addressed by `name`.
    External(String),
}

impl CredentialHelper {
    /// Name under which registry policy refers to the built-in file backend.
    pub const AUTH_FILE_NAME: &'static str = "containers-auth.json";

    pub fn from_name(name: &str) -> Self {
        if name == Self::AUTH_FILE_NAME {
            CredentialHelper::AuthFile
        } else {
            CredentialHelper::External(name.to_string())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CredentialHelper::AuthFile => Self::AUTH_FILE_NAME,
            CredentialHelper::External(name) => name,
        }
    }
}

impl fmt::Display for CredentialHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
