//! `credvault modify`: Replace an account's username and password.

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{open_store, read_field, Cli};
use crate::errors::Result;

/// Execute the `modify` command.
pub fn execute(cli: &Cli, account: &str, username: Option<&str>, password: Option<&str>) -> Result<()> {
    let mut store = open_store(cli)?;

    // Fail before prompting for new values.
    let current = store.get_account(account)?;

    let username = match username {
        Some(u) => read_field("Username", Some(u), false)?,
        None if password.is_some() => Zeroizing::new(current.username.clone()),
        None => read_field("New username", None, false)?,
    };
    let password = read_field("New password", password, true)?;

    store.modify_account(account, &username, &password)?;
    output::success(&format!("Account '{account}' updated"));

    Ok(())
}
