//! The resolution engine: fans credential operations out across the
//! configured helper chain and aggregates the results.

use std::collections::{HashMap, HashSet};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::authfile;
use crate::config::StoreConfig;
use crate::errors::{Aggregate, Error, Result};
use crate::helpers::{self, EraseOutcome, HelperClient, HelperError, ShellHelperClient};
use crate::keys;
use crate::paths;
use crate::types::{AuthFileEntry, CredentialHelper, Credentials};

/// Supplies the ordered chain of credential helpers to consult for the
/// current context. Registry-specific policy (e.g. registries.conf) lives
/// outside this crate; implement this trait to plug it in.
pub trait RegistryPolicy {
    fn credential_helpers(&self) -> Result<Vec<CredentialHelper>>;
}

/// Policy with a fixed helper chain.
#[derive(Debug, Clone)]
pub struct StaticPolicy {
    helpers: Vec<CredentialHelper>,
}

impl StaticPolicy {
    pub fn new(helpers: Vec<CredentialHelper>) -> Self {
        Self { helpers }
    }
}

impl Default for StaticPolicy {
    /// The built-in auth-file backend alone.
    fn default() -> Self {
        Self::new(vec![CredentialHelper::AuthFile])
    }
}

impl RegistryPolicy for StaticPolicy {
    fn credential_helpers(&self) -> Result<Vec<CredentialHelper>> {
        Ok(self.helpers.clone())
    }
}

/// Multi-backend credential store for container image registries.
///
/// Each operation walks the helper chain supplied by the registry policy.
/// Reads return the first non-empty hit; writes stop at the first success;
/// removals touch every backend so stale copies cannot survive.
pub struct CredentialStore {
    config: StoreConfig,
    policy: Box<dyn RegistryPolicy>,
    client: Box<dyn HelperClient>,
}

impl CredentialStore {
    /// A store over the default policy (auth files only) and the real
    /// `docker-credential-*` programs.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            policy: Box::new(StaticPolicy::default()),
            client: Box::new(ShellHelperClient),
        }
    }

    pub fn with_policy(mut self, policy: impl RegistryPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn with_helper_client(mut self, client: impl HelperClient + 'static) -> Self {
        self.client = Box::new(client);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the credentials matching `key`: a repository, a namespace
    /// within a registry, or a registry hostname. `None` when no backend
    /// holds an entry; errors from earlier backends surface only if no
    /// backend produces a hit.
    pub fn get(&self, key: &str) -> Result<Option<Credentials>> {
        keys::validate_key(key)?;

        if let Some(creds) = self.config.inline_credentials() {
            debug!(key, "returning caller-supplied credentials");
            return Ok(Some(creds.clone()));
        }

        let registry = keys::registry_of(key);
        let mut errs = Aggregate::new();
        for helper in self.policy.credential_helpers()? {
            let lookup = match &helper {
                CredentialHelper::AuthFile => self.get_from_auth_files(key, registry),
                // Helpers only understand registries; the namespace portion
                // of the key is intentionally dropped here.
                CredentialHelper::External(name) => {
                    helpers::get_from_helper(self.client.as_ref(), name, registry)
                }
            };
            match lookup {
                Ok(Some(creds)) => {
                    debug!(key, helper = %helper, "found credentials");
                    return Ok(Some(creds));
                }
                Ok(None) => {}
                Err(err) => {
                    debug!(key, helper = %helper, error = %err, "credential lookup failed");
                    errs.push(err);
                }
            }
        }

        if let Some(err) = errs.into_error() {
            return Err(err);
        }
        debug!(key, "no credentials found");
        Ok(None)
    }

    /// Stores `username`/`secret` under `key`, in the first backend of the
    /// chain that accepts it. Returns a human-readable description of the
    /// updated location; its form is not an API.
    pub fn set(&self, key: &str, username: &str, secret: &str) -> Result<String> {
        let is_namespaced = keys::validate_key(key)?;

        let mut errs = Aggregate::new();
        for helper in self.policy.credential_helpers()? {
            let attempt = match &helper {
                CredentialHelper::AuthFile => authfile::modify_auth_file(&self.config, |doc| {
                    if let Some(embedded) = doc.cred_helpers.get(key) {
                        if is_namespaced {
                            return Err(Error::UnsupportedNamespace {
                                helper: embedded.clone(),
                            });
                        }
                        let description = helpers::set_to_helper(
                            self.client.as_ref(),
                            embedded,
                            key,
                            username,
                            secret,
                        )?;
                        return Ok((false, description));
                    }
                    let auth = STANDARD.encode(format!("{username}:{secret}"));
                    doc.auths.insert(
                        key.to_string(),
                        AuthFileEntry {
                            auth,
                            identity_token: None,
                        },
                    );
                    Ok((true, String::new()))
                }),
                CredentialHelper::External(name) => {
                    if is_namespaced {
                        Err(Error::UnsupportedNamespace {
                            helper: name.clone(),
                        })
                    } else {
                        helpers::set_to_helper(self.client.as_ref(), name, key, username, secret)
                    }
                }
            };
            match attempt {
                Ok(description) => {
                    debug!(key, helper = %helper, "stored credentials");
                    return Ok(description);
                }
                Err(err) => {
                    debug!(key, helper = %helper, error = %err, "storing credentials failed");
                    errs.push(err);
                }
            }
        }

        match errs.into_error() {
            Some(err) => Err(err),
            None => Ok(String::new()),
        }
    }

    /// [`CredentialStore::set`] without the location description.
    pub fn set_authentication(&self, key: &str, username: &str, secret: &str) -> Result<()> {
        self.set(key, username, secret).map(|_| ())
    }

    /// Returns the username/password pair for `key`, or a pair of empty
    /// strings when nothing is stored. Identity tokens cannot be represented
    /// by this API and fail with [`Error::NotSupported`].
    #[deprecated(note = "use `get`, which also supports identity tokens")]
    pub fn get_basic_auth(&self, key: &str) -> Result<(String, String)> {
        match self.get(key)? {
            Some(creds) if creds.identity_token.is_some() => Err(Error::NotSupported),
            Some(creds) => Ok((creds.username, creds.password)),
            None => Ok((String::new(), String::new())),
        }
    }

    /// Removes the credentials for `key` from every configured backend.
    /// Fails with [`Error::NotLoggedIn`] when no backend held anything.
    pub fn remove(&self, key: &str) -> Result<()> {
        let is_namespaced = keys::validate_key(key)?;

        let mut errs = Aggregate::new();
        let mut logged_in = false;

        for helper in self.policy.credential_helpers()? {
            match &helper {
                CredentialHelper::AuthFile => {
                    let mut embedded: Option<Result<Option<EraseOutcome>>> = None;
                    let mut deleted = false;
                    let transaction = authfile::modify_auth_file(&self.config, |doc| {
                        if let Some(name) = doc.cred_helpers.get(key).cloned() {
                            embedded = Some(self.erase_via_helper(&name, key, is_namespaced));
                        }
                        deleted = doc.auths.remove(key).is_some();
                        // The file is rewritten only when an entry actually
                        // went away.
                        Ok((deleted, String::new()))
                    });
                    if deleted {
                        debug!(key, "credentials deleted from auth file");
                        logged_in = true;
                    }
                    match embedded {
                        Some(Ok(Some(EraseOutcome::Deleted))) => logged_in = true,
                        Some(Err(err)) => errs.push(err),
                        Some(Ok(Some(EraseOutcome::NotFound))) | Some(Ok(None)) | None => {}
                    }
                    if let Err(err) = transaction {
                        errs.push(err);
                    }
                }
                CredentialHelper::External(name) => {
                    match self.erase_via_helper(name, key, is_namespaced) {
                        Ok(Some(EraseOutcome::Deleted)) => {
                            debug!(key, helper = name.as_str(), "credentials deleted");
                            logged_in = true;
                        }
                        Ok(Some(EraseOutcome::NotFound)) => {
                            debug!(key, helper = name.as_str(), "not logged in");
                        }
                        Ok(None) => {}
                        Err(err) => errs.push(err),
                    }
                }
            }
        }

        if let Some(err) = errs.into_error() {
            return Err(err);
        }
        if !logged_in {
            return Err(Error::NotLoggedIn);
        }
        Ok(())
    }

    /// Deletes every stored credential from every configured backend.
    pub fn remove_all(&self) -> Result<()> {
        let mut errs = Aggregate::new();
        for helper in self.policy.credential_helpers()? {
            let result = match &helper {
                CredentialHelper::AuthFile => {
                    authfile::modify_auth_file(&self.config, |doc| {
                        // Helpers named by credHelpers entries are expected
                        // to be installed; a failed erase aborts the
                        // transaction before anything is dropped.
                        for (registry, embedded) in &doc.cred_helpers {
                            helpers::erase_from_helper(self.client.as_ref(), embedded, registry)?;
                        }
                        doc.cred_helpers.clear();
                        doc.auths.clear();
                        Ok((true, String::new()))
                    })
                    .map(|_| ())
                }
                CredentialHelper::External(name) => self.remove_all_from_external(name),
            };
            match result {
                Ok(()) => debug!(helper = %helper, "all credentials removed"),
                Err(err) => {
                    debug!(helper = %helper, error = %err, "removing credentials failed");
                    errs.push(err);
                }
            }
        }
        match errs.into_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Enumerates stored credentials across every backend, keyed the way a
    /// caller would look them up. Keys normalizing to `index.docker.io` are
    /// re-exposed under `docker.io`.
    pub fn get_all(&self) -> Result<HashMap<String, Credentials>> {
        let normalized_docker_io = keys::normalize_registry("docker.io");
        let mut all_keys: HashSet<String> = HashSet::new();

        for helper in self.policy.credential_helpers()? {
            match &helper {
                CredentialHelper::AuthFile => {
                    let home = self.config.resolved_home()?;
                    for auth_path in
                        paths::auth_file_paths(&self.config, std::env::consts::OS, &home)
                    {
                        let doc = auth_path.parse()?;
                        // credHelpers entries map straight to registries.
                        all_keys.extend(doc.cred_helpers.keys().cloned());
                        for file_key in doc.auths.keys() {
                            let key =
                                keys::normalize_file_key(file_key, auth_path.legacy_format);
                            if key == normalized_docker_io {
                                all_keys.insert("docker.io".to_string());
                            } else {
                                all_keys.insert(key.to_string());
                            }
                        }
                    }
                }
                CredentialHelper::External(name) => match self.client.list(name) {
                    Ok(stored) => all_keys.extend(stored.into_keys()),
                    Err(HelperError::NotInstalled { .. }) => {
                        debug!(helper = name.as_str(), "credential helper is not installed");
                    }
                    Err(err) => return Err(err.into()),
                },
            }
        }

        let mut credentials = HashMap::new();
        for key in all_keys {
            if let Some(creds) = self.get(&key)? {
                credentials.insert(key, creds);
            }
        }
        Ok(credentials)
    }

    fn get_from_auth_files(&self, key: &str, registry: &str) -> Result<Option<Credentials>> {
        let home = self.config.resolved_home()?;
        for auth_path in paths::auth_file_paths(&self.config, std::env::consts::OS, &home) {
            if let Some(creds) = authfile::find_credentials_in_file(
                key,
                registry,
                &auth_path,
                self.client.as_ref(),
            )? {
                debug!(key, path = %auth_path.path.display(), "found credentials in auth file");
                return Ok(Some(creds));
            }
        }
        Ok(None)
    }

    /// Erases `key` from one named helper. Namespaced keys are skipped
    /// (`Ok(None)`) because helpers only accept registries; a helper miss is
    /// `Ok(Some(NotFound))`, not a failure.
    fn erase_via_helper(
        &self,
        name: &str,
        key: &str,
        is_namespaced: bool,
    ) -> Result<Option<EraseOutcome>> {
        if is_namespaced {
            debug!(
                helper = name,
                key, "not removing credentials: namespaced keys are not supported by helpers"
            );
            return Ok(None);
        }
        helpers::erase_from_helper(self.client.as_ref(), name, key).map(Some)
    }

    /// Clears an external helper for `remove_all`: enumerate, then erase each
    /// entry. A helper that is not installed has nothing to clear.
    fn remove_all_from_external(&self, name: &str) -> Result<()> {
        let stored = match self.client.list(name) {
            Ok(stored) => stored,
            Err(HelperError::NotInstalled { .. }) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        for registry in stored.keys() {
            helpers::erase_from_helper(self.client.as_ref(), name, registry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::testing::MockHelperClient;
    use crate::paths::AuthPath;
    use crate::types::AuthFileDoc;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    fn store_at(path: &Path, client: &Arc<MockHelperClient>) -> CredentialStore {
        CredentialStore::new(StoreConfig::new().auth_file_path(path))
            .with_helper_client(Arc::clone(client))
    }

    fn chain(helpers: &[&str]) -> StaticPolicy {
        StaticPolicy::new(helpers.iter().map(|h| CredentialHelper::from_name(h)).collect())
    }

    fn seed_file(path: &Path, doc: &AuthFileDoc) {
        fs::write(path, serde_json::to_vec(doc).unwrap()).unwrap();
    }

    fn parse_file(path: &Path) -> AuthFileDoc {
        AuthPath::modern(path.to_path_buf()).parse().unwrap()
    }

    #[test]
    fn cred_helpers_delegation_returns_the_helper_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let mut doc = AuthFileDoc::default();
        doc.cred_helpers.insert("ghcr.io".into(), "osxkeychain".into());
        seed_file(&path, &doc);

        let client = Arc::new(
            MockHelperClient::new().with_credentials("osxkeychain", "ghcr.io", "<token>", "T"),
        );
        let store = store_at(&path, &client);

        let creds = store.get("ghcr.io/o/i").unwrap().unwrap();
        assert_eq!(creds, Credentials::token("T"));
        assert_eq!(client.calls(), vec!["get:osxkeychain:ghcr.io"]);
    }

    #[test]
    fn inline_credentials_short_circuit_every_backend() {
        let store = CredentialStore::new(
            StoreConfig::new()
                .auth_file_path("/nonexistent/auth.json")
                .credentials(Credentials::basic("inline", "pw")),
        )
        .with_helper_client(MockHelperClient::new());

        let creds = store.get("quay.io/team/img").unwrap().unwrap();
        assert_eq!(creds.username, "inline");
    }

    #[test]
    fn get_prefers_the_first_backend_in_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let mut doc = AuthFileDoc::default();
        doc.auths.insert(
            "quay.io".into(),
            AuthFileEntry {
                auth: STANDARD.encode("fileuser:filepw"),
                identity_token: None,
            },
        );
        seed_file(&path, &doc);

        let client = Arc::new(
            MockHelperClient::new().with_credentials("pass", "quay.io", "helperuser", "pw"),
        );
        let store = store_at(&path, &client).with_policy(chain(&["pass", "containers-auth.json"]));

        let creds = store.get("quay.io").unwrap().unwrap();
        assert_eq!(creds.username, "helperuser");
    }

    #[test]
    fn get_carries_helper_errors_past_a_later_hit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let mut doc = AuthFileDoc::default();
        doc.auths.insert(
            "quay.io".into(),
            AuthFileEntry {
                auth: STANDARD.encode("alice:secret"),
                identity_token: None,
            },
        );
        seed_file(&path, &doc);

        // "vault" is not installed: an error for get, but the file backend
        // still satisfies the lookup.
        let client = Arc::new(MockHelperClient::new());
        let store =
            store_at(&path, &client).with_policy(chain(&["vault", "containers-auth.json"]));
        let creds = store.get("quay.io").unwrap().unwrap();
        assert_eq!(creds.username, "alice");

        // With no later hit the accumulated error surfaces.
        let dir2 = tempfile::tempdir().unwrap();
        let store = store_at(&dir2.path().join("auth.json"), &client)
            .with_policy(chain(&["vault", "containers-auth.json"]));
        let err = store.get("quay.io").unwrap_err();
        assert!(err.to_string().contains("docker-credential-vault"));
    }

    #[test]
    fn set_writes_the_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let store = store_at(&path, &Arc::new(MockHelperClient::new()));

        let description = store.set("quay.io/team", "alice", "secret").unwrap();
        assert_eq!(description, path.display().to_string());

        let doc = parse_file(&path);
        assert_eq!(
            doc.auths["quay.io/team"].auth,
            STANDARD.encode("alice:secret")
        );
    }

    #[test]
    fn set_delegates_to_an_embedded_helper_without_dirtying_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let mut doc = AuthFileDoc::default();
        doc.cred_helpers.insert("ghcr.io".into(), "osxkeychain".into());
        seed_file(&path, &doc);
        let before = fs::read(&path).unwrap();

        let client = Arc::new(MockHelperClient::new().with_helper("osxkeychain"));
        let store = store_at(&path, &client);

        let description = store.set("ghcr.io", "alice", "secret").unwrap();
        assert_eq!(description, "credential helper: osxkeychain");
        // The write went to the helper; the file itself is untouched.
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(
            client.stored("osxkeychain", "ghcr.io"),
            Some(("alice".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn set_rejects_namespaced_keys_for_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");

        // External helper chain only.
        let client = Arc::new(MockHelperClient::new().with_helper("pass"));
        let store = store_at(&path, &client).with_policy(chain(&["pass"]));
        let err = store.set("quay.io/team", "alice", "secret").unwrap_err();
        assert!(matches!(err, Error::UnsupportedNamespace { .. }));

        // Embedded helper behind a namespaced credHelpers entry.
        let mut doc = AuthFileDoc::default();
        doc.cred_helpers
            .insert("quay.io/team".into(), "osxkeychain".into());
        seed_file(&path, &doc);
        let client = Arc::new(MockHelperClient::new().with_helper("osxkeychain"));
        let store = store_at(&path, &client);
        let err = store.set("quay.io/team", "alice", "secret").unwrap_err();
        assert!(matches!(err, Error::UnsupportedNamespace { .. }));
    }

    #[test]
    fn set_stops_at_the_first_successful_helper() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        // "vault" is not installed and fails; "pass" accepts the write.
        let client = Arc::new(MockHelperClient::new().with_helper("pass"));
        let store = store_at(&path, &client).with_policy(chain(&["vault", "pass"]));

        let description = store.set("quay.io", "alice", "secret").unwrap();
        assert_eq!(description, "credential helper: pass");
        assert!(!path.exists());
    }

    #[test]
    fn set_aggregates_when_every_helper_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let store = store_at(&path, &Arc::new(MockHelperClient::new()))
            .with_policy(chain(&["vault", "pass"]));

        let err = store.set("quay.io", "alice", "secret").unwrap_err();
        match err {
            Error::Aggregate(errs) => assert_eq!(errs.errors().len(), 2),
            other => panic!("expected an aggregate, got {other}"),
        }
    }

    #[test]
    fn remove_purges_every_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let mut doc = AuthFileDoc::default();
        doc.auths.insert(
            "quay.io".into(),
            AuthFileEntry {
                auth: STANDARD.encode("alice:secret"),
                identity_token: None,
            },
        );
        seed_file(&path, &doc);

        let client =
            Arc::new(MockHelperClient::new().with_credentials("pass", "quay.io", "alice", "pw"));
        let store = store_at(&path, &client).with_policy(chain(&["containers-auth.json", "pass"]));

        store.remove("quay.io").unwrap();
        assert!(parse_file(&path).auths.is_empty());
        assert!(client.stored("pass", "quay.io").is_none());

        // Both copies are gone; a second removal has nothing left to delete.
        assert!(matches!(store.remove("quay.io"), Err(Error::NotLoggedIn)));
    }

    #[test]
    fn remove_delegates_to_the_embedded_helper() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let mut doc = AuthFileDoc::default();
        doc.cred_helpers.insert("ghcr.io".into(), "osxkeychain".into());
        seed_file(&path, &doc);

        let client = Arc::new(
            MockHelperClient::new().with_credentials("osxkeychain", "ghcr.io", "alice", "pw"),
        );
        let store = store_at(&path, &client);

        store.remove("ghcr.io").unwrap();
        assert!(client.stored("osxkeychain", "ghcr.io").is_none());
        // The credHelpers routing entry survives; only the stored secret is
        // deleted.
        assert_eq!(parse_file(&path).cred_helpers["ghcr.io"], "osxkeychain");
    }

    #[test]
    fn remove_skips_external_helpers_for_namespaced_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let mut doc = AuthFileDoc::default();
        doc.auths.insert(
            "quay.io/team".into(),
            AuthFileEntry {
                auth: STANDARD.encode("alice:secret"),
                identity_token: None,
            },
        );
        seed_file(&path, &doc);

        let client = Arc::new(MockHelperClient::new().with_helper("pass"));
        let store = store_at(&path, &client).with_policy(chain(&["containers-auth.json", "pass"]));

        store.remove("quay.io/team").unwrap();
        assert!(parse_file(&path).auths.is_empty());
        // The helper saw no erase call for the namespaced key.
        assert!(client.calls().iter().all(|call| !call.starts_with("erase:")));
    }

    #[test]
    fn remove_all_empties_both_maps_and_erases_embedded_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let mut doc = AuthFileDoc::default();
        doc.auths.insert(
            "r1".into(),
            AuthFileEntry {
                auth: STANDARD.encode("u:p"),
                identity_token: None,
            },
        );
        doc.cred_helpers.insert("r2".into(), "h".into());
        seed_file(&path, &doc);

        let client = Arc::new(MockHelperClient::new().with_credentials("h", "r2", "u", "p"));
        let store = store_at(&path, &client);

        store.remove_all().unwrap();

        let doc = parse_file(&path);
        assert!(doc.auths.is_empty());
        assert!(doc.cred_helpers.is_empty());
        let erase_calls = client
            .calls()
            .into_iter()
            .filter(|call| call == "erase:h:r2")
            .count();
        assert_eq!(erase_calls, 1);
    }

    #[test]
    fn remove_all_ignores_missing_external_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");

        let client =
            Arc::new(MockHelperClient::new().with_credentials("pass", "quay.io", "u", "p"));
        let store = store_at(&path, &client)
            .with_policy(chain(&["containers-auth.json", "pass", "vault"]));

        store.remove_all().unwrap();
        assert!(client.list("pass").unwrap().is_empty());
    }

    #[test]
    fn get_all_sweeps_files_and_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let mut doc = AuthFileDoc::default();
        doc.auths.insert(
            "https://index.docker.io/v1/".into(),
            AuthFileEntry {
                auth: STANDARD.encode("hubuser:hubpw"),
                identity_token: None,
            },
        );
        doc.auths.insert(
            "quay.io/team".into(),
            AuthFileEntry {
                auth: STANDARD.encode("alice:secret"),
                identity_token: None,
            },
        );
        doc.cred_helpers.insert("ghcr.io".into(), "osxkeychain".into());
        seed_file(&path, &doc);

        let client = Arc::new(
            MockHelperClient::new()
                .with_credentials("osxkeychain", "ghcr.io", "<token>", "T")
                .with_credentials("pass", "registry.example.com", "bob", "pw"),
        );
        let store = store_at(&path, &client).with_policy(chain(&[
            "containers-auth.json",
            "pass",
            "vault",
        ]));

        let all = store.get_all().unwrap();
        // The /v1/ URL entry is re-exposed under docker.io.
        assert_eq!(all["docker.io"], Credentials::basic("hubuser", "hubpw"));
        assert_eq!(all["quay.io/team"], Credentials::basic("alice", "secret"));
        assert_eq!(all["ghcr.io"], Credentials::token("T"));
        assert_eq!(
            all["registry.example.com"],
            Credentials::basic("bob", "pw")
        );
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn basic_auth_rejects_identity_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let mut doc = AuthFileDoc::default();
        doc.cred_helpers.insert("ghcr.io".into(), "osxkeychain".into());
        seed_file(&path, &doc);

        let client = Arc::new(
            MockHelperClient::new().with_credentials("osxkeychain", "ghcr.io", "<token>", "T"),
        );
        let store = store_at(&path, &client);

        #[allow(deprecated)]
        {
            assert!(matches!(
                store.get_basic_auth("ghcr.io"),
                Err(Error::NotSupported)
            ));
            assert_eq!(
                store.get_basic_auth("unknown.example.com").unwrap(),
                (String::new(), String::new())
            );
        }
    }
}
