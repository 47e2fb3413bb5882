//! One module per subcommand, each exposing `execute`.

pub mod add;
pub mod delete;
pub mod get;
pub mod init;
pub mod list;
pub mod modify;
