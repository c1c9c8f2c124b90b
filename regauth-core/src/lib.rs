//! Credential storage for container image registries.
//!
//! Authentication material (username/password pairs or OAuth2 identity
//! tokens) is resolved across a prioritized chain of backends: the built-in
//! JSON auth-file backend (`auth.json`, `~/.docker/config.json`, legacy
//! `~/.dockercfg`) and any number of external `docker-credential-*` helper
//! programs. Reads return the first hit in the chain, writes stop at the
//! first backend that accepts them, and removals purge every backend.
//!
//! ```no_run
//! use regauth_core::{CredentialStore, StoreConfig};
//!
//! let store = CredentialStore::new(StoreConfig::new());
//! store.set("quay.io/team", "alice", "hunter2")?;
//! if let Some(creds) = store.get("quay.io/team/image")? {
//!     println!("logged in as {}", creds.username);
//! }
//! # Ok::<(), regauth_core::Error>(())
//! ```

mod authfile;
pub mod config;
pub mod errors;
pub mod helpers;
pub mod keys;
pub mod paths;
pub mod store;
pub mod types;

pub use config::StoreConfig;
pub use errors::{Aggregate, Error, Result};
pub use helpers::{HelperClient, HelperError, ShellHelperClient};
pub use paths::AuthPath;
pub use store::{CredentialStore, RegistryPolicy, StaticPolicy};
pub use types::{AuthFileDoc, AuthFileEntry, CredentialHelper, Credentials};
