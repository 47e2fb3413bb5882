//! `credvault get`: Print an account's password (or username).

use crate::cli::{open_store, Cli};
use crate::errors::Result;
use crate::vault::MessageId;

/// Execute the `get` command.
pub fn execute(cli: &Cli, account: &str, username: bool) -> Result<()> {
    let mut store = open_store(cli)?;

    let field = if username {
        MessageId::Username
    } else {
        MessageId::Password
    };
    let message = store.read_message(account, field)?;
    println!("{}", message.as_str());

    Ok(())
}
