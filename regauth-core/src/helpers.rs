//! Typed adapter over external `docker-credential-*` helper programs.
//!
//! The subprocess wire contract (JSON over stdin/stdout, four sub-commands)
//! lives behind the [`HelperClient`] trait; [`ShellHelperClient`] drives the
//! real programs and tests substitute their own implementation. The adapter
//! functions below translate the wire conventions into domain terms: the
//! `<token>` username sentinel marks an identity token, and the literal
//! `credentials not found` message marks a miss.

use std::collections::HashMap;
use std::io::{self, Write};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::Credentials;

/// Username a helper reports when the stored secret is an identity token.
const TOKEN_USERNAME: &str = "<token>";
/// Message a helper prints when it holds nothing for the requested server.
const NOT_FOUND_MESSAGE: &str = "credentials not found";

/// Failure modes of one helper invocation.
#[derive(Debug, Error)]
pub enum HelperError {
    /// The helper executable is not on `$PATH`. Enumeration-style callers
    /// treat this as "helper not installed" rather than a failure.
    #[error("credential helper docker-credential-{name} is not installed")]
    NotInstalled { name: String },

    /// The helper ran and reported an error.
    #[error("credential helper {name} failed: {message}")]
    Failed { name: String, message: String },

    /// The helper could not be driven at all.
    #[error("running credential helper {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl HelperError {
    /// True when the helper signalled a miss rather than a failure.
    fn is_not_found(&self) -> bool {
        matches!(self, HelperError::Failed { message, .. } if message == NOT_FOUND_MESSAGE)
    }
}

/// The credential-helper subprocess contract.
///
/// `helper` is the short name; the concrete program is
/// `docker-credential-<helper>`. All methods block until the subprocess
/// exits.
pub trait HelperClient {
    /// Returns the raw `(username, secret)` pair stored for `registry`.
    fn get(&self, helper: &str, registry: &str) -> Result<(String, String), HelperError>;

    /// Stores a `(username, secret)` pair for `registry`.
    fn store(
        &self,
        helper: &str,
        registry: &str,
        username: &str,
        secret: &str,
    ) -> Result<(), HelperError>;

    /// Deletes whatever is stored for `registry`.
    fn erase(&self, helper: &str, registry: &str) -> Result<(), HelperError>;

    /// Enumerates stored entries as a map from registry to username.
    fn list(&self, helper: &str) -> Result<HashMap<String, String>, HelperError>;
}

impl<T> HelperClient for std::sync::Arc<T>
where
    T: HelperClient + ?Sized,
{
    fn get(&self, helper: &str, registry: &str) -> Result<(String, String), HelperError> {
        (**self).get(helper, registry)
    }

    fn store(
        &self,
        helper: &str,
        registry: &str,
        username: &str,
        secret: &str,
    ) -> Result<(), HelperError> {
        (**self).store(helper, registry, username, secret)
    }

    fn erase(&self, helper: &str, registry: &str) -> Result<(), HelperError> {
        (**self).erase(helper, registry)
    }

    fn list(&self, helper: &str) -> Result<HashMap<String, String>, HelperError> {
        (**self).list(helper)
    }
}

#[derive(Debug, Deserialize)]
struct WireCredentials {
    #[serde(rename = "Username", default)]
    username: String,
    #[serde(rename = "Secret", default)]
    secret: String,
}

#[derive(Debug, Serialize)]
struct WireStoreRequest<'a> {
    #[serde(rename = "ServerURL")]
    server_url: &'a str,
    #[serde(rename = "Username")]
    username: &'a str,
    #[serde(rename = "Secret")]
    secret: &'a str,
}

/// Drives `docker-credential-<name>` programs with piped stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellHelperClient;

impl ShellHelperClient {
    fn run(&self, helper: &str, action: &str, input: &[u8]) -> Result<Vec<u8>, HelperError> {
        let program = format!("docker-credential-{helper}");
        let io_err = |source: io::Error| {
            if source.kind() == io::ErrorKind::NotFound {
                HelperError::NotInstalled {
                    name: helper.to_string(),
                }
            } else {
                HelperError::Io {
                    name: helper.to_string(),
                    source,
                }
            }
        };

        debug!(helper, action, "invoking credential helper");
        let mut child = Command::new(&program)
            .arg(action)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(io_err)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input).map_err(io_err)?;
        }
        let output = child.wait_with_output().map_err(io_err)?;

        if !output.status.success() {
            // Helpers report errors (including the not-found sentinel) on
            // stdout; fall back to stderr for crashes.
            let message = if output.stdout.is_empty() {
                &output.stderr
            } else {
                &output.stdout
            };
            return Err(HelperError::Failed {
                name: helper.to_string(),
                message: String::from_utf8_lossy(message).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

impl HelperClient for ShellHelperClient {
    fn get(&self, helper: &str, registry: &str) -> Result<(String, String), HelperError> {
        let stdout = self.run(helper, "get", registry.as_bytes())?;
        let creds: WireCredentials =
            serde_json::from_slice(&stdout).map_err(|err| HelperError::Failed {
                name: helper.to_string(),
                message: format!("parsing helper response: {err}"),
            })?;
        Ok((creds.username, creds.secret))
    }

    fn store(
        &self,
        helper: &str,
        registry: &str,
        username: &str,
        secret: &str,
    ) -> Result<(), HelperError> {
        let request = WireStoreRequest {
            server_url: registry,
            username,
            secret,
        };
        let payload = serde_json::to_vec(&request).map_err(|err| HelperError::Failed {
            name: helper.to_string(),
            message: format!("encoding store request: {err}"),
        })?;
        self.run(helper, "store", &payload)?;
        Ok(())
    }

    fn erase(&self, helper: &str, registry: &str) -> Result<(), HelperError> {
        self.run(helper, "erase", registry.as_bytes())?;
        Ok(())
    }

    fn list(&self, helper: &str) -> Result<HashMap<String, String>, HelperError> {
        let stdout = self.run(helper, "list", &[])?;
        serde_json::from_slice(&stdout).map_err(|err| HelperError::Failed {
            name: helper.to_string(),
            message: format!("parsing helper list response: {err}"),
        })
    }
}

/// Outcome of an erase that distinguishes a deletion from a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EraseOutcome {
    Deleted,
    NotFound,
}

/// Fetches credentials for `registry` from helper `name`. A miss is `None`,
/// not an error; the `<token>` username marks an identity token.
pub(crate) fn get_from_helper(
    client: &dyn HelperClient,
    name: &str,
    registry: &str,
) -> crate::errors::Result<Option<Credentials>> {
    match client.get(name, registry) {
        Ok((username, secret)) => {
            if username == TOKEN_USERNAME {
                Ok(Some(Credentials::token(secret)))
            } else {
                Ok(Some(Credentials::basic(username, secret)))
            }
        }
        Err(err) if err.is_not_found() => {
            debug!(helper = name, registry, "not logged in");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Stores a username/secret pair for `registry` in helper `name` and returns
/// a human-readable description of the destination.
pub(crate) fn set_to_helper(
    client: &dyn HelperClient,
    name: &str,
    registry: &str,
    username: &str,
    secret: &str,
) -> crate::errors::Result<String> {
    client.store(name, registry, username, secret)?;
    Ok(format!("credential helper: {name}"))
}

/// Deletes credentials for `registry` from helper `name`; a miss is reported
/// as [`EraseOutcome::NotFound`] rather than an error.
pub(crate) fn erase_from_helper(
    client: &dyn HelperClient,
    name: &str,
    registry: &str,
) -> crate::errors::Result<EraseOutcome> {
    match client.erase(name, registry) {
        Ok(()) => Ok(EraseOutcome::Deleted),
        Err(err) if err.is_not_found() => Ok(EraseOutcome::NotFound),
        Err(err) => Err(err.into()),
    }
}
