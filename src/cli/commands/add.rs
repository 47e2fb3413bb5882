//! `credvault add`: Store a new account.

use crate::cli::output;
use crate::cli::{open_store, read_field, Cli};
use crate::errors::Result;

/// Execute the `add` command.
pub fn execute(cli: &Cli, account: &str, username: Option<&str>, password: Option<&str>) -> Result<()> {
    let mut store = open_store(cli)?;

    let username = read_field("Username", username, false)?;
    let password = read_field("Password", password, true)?;

    store.add_account(account, &username, &password)?;

    output::success(&format!(
        "Account '{account}' added ({} total)",
        store.account_count()?
    ));

    Ok(())
}
