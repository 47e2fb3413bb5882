//! `credvault list`: Display accounts in a table.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, search: Option<&str>) -> Result<()> {
    let mut store = open_store(cli)?;

    let accounts = store.find_accounts(search.unwrap_or(""))?;

    output::info(&format!(
        "{} of {} account(s)",
        accounts.len(),
        store.account_count()?
    ));
    output::print_accounts_table(&accounts);

    Ok(())
}
