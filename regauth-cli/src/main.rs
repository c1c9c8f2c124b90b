use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use regauth_core::{CredentialStore, Credentials, StoreConfig};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "regauth", version, about = "Container registry credential store")]
struct Cli {
    /// Use an explicit auth file instead of the default search paths.
    #[arg(long, global = true, value_name = "PATH")]
    authfile: Option<PathBuf>,

    /// Read a legacy-format (.dockercfg) auth file. Read-only.
    #[arg(long, global = true, value_name = "PATH", conflicts_with = "authfile")]
    legacy_authfile: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store credentials for a registry, namespace, or repository.
    Login(LoginArgs),
    /// Remove stored credentials.
    Logout(LogoutArgs),
    /// Print the credentials that would be used for a key.
    Get(GetArgs),
    /// List every key with stored credentials.
    List,
}

#[derive(Args)]
struct LoginArgs {
    /// Registry, namespace, or repository to log in to.
    key: String,

    #[arg(short, long)]
    username: String,

    #[arg(short, long, conflicts_with = "password_stdin")]
    password: Option<String>,

    /// Read the password from standard input.
    #[arg(long)]
    password_stdin: bool,
}

#[derive(Args)]
struct LogoutArgs {
    /// Key to log out of.
    #[arg(required_unless_present = "all")]
    key: Option<String>,

    /// Remove every credential from every configured backend.
    #[arg(long, conflicts_with = "key")]
    all: bool,
}

#[derive(Args)]
struct GetArgs {
    key: String,

    /// Print secrets instead of redacting them.
    #[arg(long)]
    show_secrets: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = StoreConfig::new();
    if let Some(path) = cli.authfile {
        config = config.auth_file_path(path);
    }
    if let Some(path) = cli.legacy_authfile {
        config = config.legacy_auth_file_path(path);
    }
    let store = CredentialStore::new(config);

    match cli.command {
        Command::Login(args) => {
            let password = match (args.password, args.password_stdin) {
                (Some(password), _) => password,
                (None, true) => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("reading password from stdin")?;
                    buf.trim_end_matches(['\r', '\n']).to_string()
                }
                (None, false) => bail!("either --password or --password-stdin is required"),
            };

            let description = store
                .set(&args.key, &args.username, &password)
                .with_context(|| format!("storing credentials for {}", args.key))?;
            println!("Credentials stored in {description}");
        }
        Command::Logout(args) => {
            if args.all {
                store.remove_all().context("removing all credentials")?;
                println!("Removed all stored credentials");
            } else {
                let key = args.key.expect("clap enforces key or --all");
                store
                    .remove(&key)
                    .with_context(|| format!("removing credentials for {key}"))?;
                println!("Removed credentials for {key}");
            }
        }
        Command::Get(args) => {
            match store
                .get(&args.key)
                .with_context(|| format!("looking up credentials for {}", args.key))?
            {
                Some(creds) => println!(
                    "{}",
                    serde_json::to_string_pretty(&render(&creds, args.show_secrets))?
                ),
                None => bail!("no credentials found for {}", args.key),
            }
        }
        Command::List => {
            let all = store.get_all().context("listing credentials")?;
            // HashMap order is arbitrary; print sorted for stable output.
            let sorted: BTreeMap<String, Credentials> = all.into_iter().collect();
            for (key, creds) in sorted {
                let user = if creds.identity_token.is_some() {
                    "<token>"
                } else {
                    creds.username.as_str()
                };
                println!("{key}\t{user}");
            }
        }
    }

    Ok(())
}

fn render(creds: &Credentials, show_secrets: bool) -> serde_json::Value {
    let redact = |value: &str| {
        if show_secrets || value.is_empty() {
            value.to_string()
        } else {
            "*****".to_string()
        }
    };

    match &creds.identity_token {
        Some(token) => json!({ "identitytoken": redact(token) }),
        None => json!({
            "username": creds.username,
            "password": redact(&creds.password),
        }),
    }
}
