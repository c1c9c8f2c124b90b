//! Discovery of auth-file locations.
//!
//! Reads walk an ordered list of candidate files; writes always target the
//! first (primary) location. The primary location comes from an explicit
//! override, the per-uid runtime directory, or the platform default; unless
//! the caller picked a file explicitly, the well-known Docker locations are
//! appended as read-only fallbacks.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::StoreConfig;
use crate::errors::{Error, Result};

/// A candidate auth-file location together with its expected format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPath {
    pub path: PathBuf,
    pub legacy_format: bool,
}

impl AuthPath {
    pub(crate) fn modern(path: PathBuf) -> Self {
        Self {
            path,
            legacy_format: false,
        }
    }

    pub(crate) fn legacy(path: PathBuf) -> Self {
        Self {
            path,
            legacy_format: true,
        }
    }
}

/// Selects the primary auth file (the write target and the first read
/// location) and reports whether it was specified by the caller.
///
/// When `$XDG_RUNTIME_DIR` is set but missing, this fails so the caller can
/// tell the user to fix the variable; the existence check is purely for that
/// diagnostic, and a missing auth file at open time stays acceptable.
pub(crate) fn primary_auth_path(
    config: &StoreConfig,
    os: &str,
    home: &Path,
) -> Result<(AuthPath, bool)> {
    if let Some(path) = config.explicit_auth_file() {
        return Ok((AuthPath::modern(path.to_path_buf()), true));
    }
    if let Some(path) = config.explicit_legacy_auth_file() {
        return Ok((AuthPath::legacy(path.to_path_buf()), true));
    }
    if let Some(root) = config.implicit_root_dir() {
        return Ok((AuthPath::modern(root.join(per_uid_relative_path())), false));
    }
    if os == "windows" || os == "macos" {
        return Ok((
            AuthPath::modern(home.join(".config/containers/auth.json")),
            false,
        ));
    }

    match env::var("XDG_RUNTIME_DIR") {
        Ok(runtime_dir) if !runtime_dir.is_empty() => {
            let runtime_dir = PathBuf::from(runtime_dir);
            if let Err(err) = std::fs::metadata(&runtime_dir) {
                if err.kind() == io::ErrorKind::NotFound {
                    return Err(Error::Io {
                        path: runtime_dir,
                        source: io::Error::new(
                            io::ErrorKind::NotFound,
                            "directory set by $XDG_RUNTIME_DIR does not exist; \
                             either create it or unset $XDG_RUNTIME_DIR",
                        ),
                    });
                }
                // Any other stat failure surfaces when the file is opened.
            }
            Ok((
                AuthPath::modern(runtime_dir.join("containers/auth.json")),
                false,
            ))
        }
        _ => Ok((
            AuthPath::modern(Path::new("/").join(per_uid_relative_path())),
            false,
        )),
    }
}

/// The ordered list of auth files consulted by reads. Some entries may not
/// exist; parsing treats a missing file as an empty document.
pub(crate) fn auth_file_paths(config: &StoreConfig, os: &str, home: &Path) -> Vec<AuthPath> {
    let mut paths = Vec::new();
    let mut user_specified = false;

    match primary_auth_path(config, os, home) {
        Ok((path, specified)) => {
            user_specified = specified;
            paths.push(path);
        }
        // A bad $XDG_RUNTIME_DIR must not break anonymous lookups; skip the
        // runtime path and keep going with the remaining candidates.
        Err(err) => warn!("{err}; continuing with the default credential search paths"),
    }

    if !user_specified {
        let xdg_config_home = env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".config"));
        paths.push(AuthPath::modern(
            xdg_config_home.join("containers/auth.json"),
        ));

        match env::var("DOCKER_CONFIG").ok().filter(|dir| !dir.is_empty()) {
            Some(docker_config) => {
                paths.push(AuthPath::modern(
                    PathBuf::from(docker_config).join("config.json"),
                ));
            }
            None => paths.push(AuthPath::modern(home.join(".docker/config.json"))),
        }

        paths.push(AuthPath::legacy(home.join(".dockercfg")));
    }

    paths
}

fn per_uid_relative_path() -> PathBuf {
    PathBuf::from(format!("run/containers/{}/auth.json", uid()))
}

#[cfg(unix)]
fn uid() -> u32 {
    rustix::process::getuid().as_raw()
}

#[cfg(not(unix))]
fn uid() -> u32 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // The environment is process-global; every test touching it serializes
    // through this lock and restores what it changed.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn set(vars: &[(&'static str, Option<&str>)]) -> Self {
            let saved = vars
                .iter()
                .map(|(name, value)| {
                    let old = env::var(name).ok();
                    match value {
                        Some(value) => env::set_var(name, value),
                        None => env::remove_var(name),
                    }
                    (*name, old)
                })
                .collect();
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in self.saved.drain(..) {
                match value {
                    Some(value) => env::set_var(name, value),
                    None => env::remove_var(name),
                }
            }
        }
    }

    #[test]
    fn explicit_paths_win_and_suppress_fallbacks() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = EnvGuard::set(&[("XDG_RUNTIME_DIR", None)]);
        let home = Path::new("/home/tester");

        let config = StoreConfig::new().auth_file_path("/etc/containers/auth.json");
        let (primary, user_specified) = primary_auth_path(&config, "linux", home).unwrap();
        assert_eq!(primary, AuthPath::modern("/etc/containers/auth.json".into()));
        assert!(user_specified);
        assert_eq!(auth_file_paths(&config, "linux", home), vec![primary]);

        let config = StoreConfig::new().legacy_auth_file_path("/etc/dockercfg");
        let (primary, user_specified) = primary_auth_path(&config, "linux", home).unwrap();
        assert_eq!(primary, AuthPath::legacy("/etc/dockercfg".into()));
        assert!(user_specified);
    }

    #[test]
    fn implicit_root_resolves_the_per_uid_path() {
        let home = Path::new("/home/tester");
        let config = StoreConfig::new().implicit_root("/sysroot");
        let (primary, user_specified) = primary_auth_path(&config, "linux", home).unwrap();
        assert!(!user_specified);
        assert_eq!(
            primary.path,
            Path::new("/sysroot").join(format!("run/containers/{}/auth.json", uid()))
        );
        assert!(!primary.legacy_format);
    }

    #[test]
    fn non_linux_defaults_to_the_config_dir() {
        let home = Path::new("/Users/tester");
        for os in ["macos", "windows"] {
            let (primary, user_specified) =
                primary_auth_path(&StoreConfig::new(), os, home).unwrap();
            assert!(!user_specified);
            assert_eq!(
                primary.path,
                Path::new("/Users/tester/.config/containers/auth.json")
            );
        }
    }

    #[test]
    fn runtime_dir_is_used_when_it_exists() {
        let _lock = ENV_LOCK.lock().unwrap();
        let runtime_dir = tempfile::tempdir().unwrap();
        let _env = EnvGuard::set(&[("XDG_RUNTIME_DIR", Some(runtime_dir.path().to_str().unwrap()))]);

        let (primary, user_specified) =
            primary_auth_path(&StoreConfig::new(), "linux", Path::new("/home/tester")).unwrap();
        assert!(!user_specified);
        assert_eq!(primary.path, runtime_dir.path().join("containers/auth.json"));
    }

    #[test]
    fn missing_runtime_dir_is_an_error_but_reads_continue() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = EnvGuard::set(&[
            ("XDG_RUNTIME_DIR", Some("/nonexistent/regauth-test")),
            ("XDG_CONFIG_HOME", None),
            ("DOCKER_CONFIG", None),
        ]);
        let home = Path::new("/home/tester");

        let err = primary_auth_path(&StoreConfig::new(), "linux", home).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("XDG_RUNTIME_DIR"));

        // The read path degrades to the fallback locations.
        let paths = auth_file_paths(&StoreConfig::new(), "linux", home);
        assert_eq!(
            paths,
            vec![
                AuthPath::modern("/home/tester/.config/containers/auth.json".into()),
                AuthPath::modern("/home/tester/.docker/config.json".into()),
                AuthPath::legacy("/home/tester/.dockercfg".into()),
            ]
        );
    }

    #[test]
    fn fallbacks_honor_xdg_config_home_and_docker_config() {
        let _lock = ENV_LOCK.lock().unwrap();
        let runtime_dir = tempfile::tempdir().unwrap();
        let _env = EnvGuard::set(&[
            ("XDG_RUNTIME_DIR", Some(runtime_dir.path().to_str().unwrap())),
            ("XDG_CONFIG_HOME", Some("/custom/config")),
            ("DOCKER_CONFIG", Some("/custom/docker")),
        ]);
        let home = Path::new("/home/tester");

        let paths = auth_file_paths(&StoreConfig::new(), "linux", home);
        assert_eq!(
            paths,
            vec![
                AuthPath::modern(runtime_dir.path().join("containers/auth.json")),
                AuthPath::modern("/custom/config/containers/auth.json".into()),
                AuthPath::modern("/custom/docker/config.json".into()),
                AuthPath::legacy("/home/tester/.dockercfg".into()),
            ]
        );
    }
}
