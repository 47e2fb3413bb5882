//! CLI: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{CredVaultError, Result};
use crate::vault::AccountStore;

/// Minimum passphrase length to prevent trivially weak passphrases.
const MIN_PASSPHRASE_LEN: usize = 8;

/// Environment variable holding the store passphrase for scripted use.
pub const PASSPHRASE_ENV_VAR: &str = "CREDVAULT_PASSPHRASE";

/// CredVault CLI: encrypted account and password store.
#[derive(Parser)]
#[command(
    name = "credvault",
    about = "Encrypted account and password store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Password store file (default: `store_file` from .credvault.toml)
    #[arg(long, global = true, env = "CREDVAULT_FILE")]
    pub file: Option<String>,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new, empty password store
    Init,

    /// Add a new account
    Add {
        /// Account or website name (e.g. github)
        account: String,
        /// Username (prompted if omitted)
        #[arg(short, long)]
        username: Option<String>,
        /// Password (prompted if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Change an account's username and password
    Modify {
        /// Account name
        account: String,
        /// New username (prompted if omitted)
        #[arg(short, long)]
        username: Option<String>,
        /// New password (prompted if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Delete an account
    Delete {
        /// Account name
        account: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Print an account's password
    Get {
        /// Account name
        account: String,
        /// Print the username instead of the password
        #[arg(long)]
        username: bool,
    },

    /// List accounts
    List {
        /// Only show accounts whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load `.credvault.toml` from the working directory.
pub fn load_settings() -> Result<Settings> {
    Settings::load(&std::env::current_dir()?)
}

/// Resolve the store file: `--file` wins over the config file.
pub fn store_path(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    let file = cli.file.as_deref().unwrap_or(&settings.store_file);
    Ok(std::env::current_dir()?.join(file))
}

/// Get the store passphrase from `CREDVAULT_PASSPHRASE` or a prompt.
///
/// Returns `Zeroizing<String>` so the passphrase is wiped from memory on drop.
pub fn prompt_passphrase() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSPHRASE_ENV_VAR) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter store passphrase")
        .interact()
        .map_err(|e| CredVaultError::InvalidInput(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new passphrase with confirmation (used by `init`).
///
/// Also respects `CREDVAULT_PASSPHRASE`, and enforces a minimum length.
pub fn prompt_new_passphrase() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSPHRASE_ENV_VAR) {
        if !pw.is_empty() {
            if pw.len() < MIN_PASSPHRASE_LEN {
                return Err(CredVaultError::InvalidInput(format!(
                    "passphrase must be at least {MIN_PASSPHRASE_LEN} characters"
                )));
            }
            return Ok(Zeroizing::new(pw));
        }
    }

    loop {
        let passphrase = dialoguer::Password::new()
            .with_prompt("Choose store passphrase")
            .with_confirmation(
                "Confirm store passphrase",
                "Passphrases do not match, try again",
            )
            .interact()
            .map_err(|e| CredVaultError::InvalidInput(format!("passphrase prompt: {e}")))?;

        if passphrase.len() < MIN_PASSPHRASE_LEN {
            output::warning(&format!(
                "Passphrase must be at least {MIN_PASSPHRASE_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(passphrase));
    }
}

/// Resolve a username or password field.
///
/// Sources, in order: the command-line value, one line of piped stdin,
/// an interactive prompt (hidden when `secret` is set).
pub fn read_field(label: &str, value: Option<&str>, secret: bool) -> Result<Zeroizing<String>> {
    if let Some(v) = value {
        if secret {
            output::warning("Password provided on command line; it may appear in shell history.");
        }
        return Ok(Zeroizing::new(v.to_string()));
    }

    if !io::stdin().is_terminal() {
        let mut line = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut line)?;
        let trimmed = line.trim_end_matches(['\r', '\n']).to_string();
        return Ok(Zeroizing::new(trimmed));
    }

    let entered = if secret {
        dialoguer::Password::new()
            .with_prompt(label)
            .allow_empty_password(true)
            .interact()
    } else {
        dialoguer::Input::<String>::new()
            .with_prompt(label)
            .allow_empty(true)
            .interact_text()
    }
    .map_err(|e| CredVaultError::InvalidInput(format!("{label} prompt: {e}")))?;
    Ok(Zeroizing::new(entered))
}

/// Open the store named by the CLI arguments, prompting for the passphrase.
pub fn open_store(cli: &Cli) -> Result<AccountStore> {
    let settings = load_settings()?;
    let path = store_path(cli, &settings)?;
    if !path.exists() {
        output::tip("Run `credvault init` to create a store.");
        return Err(CredVaultError::StoreNotFound(path));
    }

    let passphrase = prompt_passphrase()?;
    let mut store = AccountStore::new(settings.store_options());
    store.open(&path, passphrase.as_bytes())?;
    Ok(store)
}
