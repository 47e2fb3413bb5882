use clap::Parser;
use credvault::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --verbose picks debug, default is warnings only.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("credvault=debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Init => credvault::cli::commands::init::execute(&cli),
        Commands::Add {
            ref account,
            ref username,
            ref password,
        } => credvault::cli::commands::add::execute(
            &cli,
            account,
            username.as_deref(),
            password.as_deref(),
        ),
        Commands::Modify {
            ref account,
            ref username,
            ref password,
        } => credvault::cli::commands::modify::execute(
            &cli,
            account,
            username.as_deref(),
            password.as_deref(),
        ),
        Commands::Delete { ref account, force } => {
            credvault::cli::commands::delete::execute(&cli, account, force)
        }
        Commands::Get {
            ref account,
            username,
        } => credvault::cli::commands::get::execute(&cli, account, username),
        Commands::List { ref search } => {
            credvault::cli::commands::list::execute(&cli, search.as_deref())
        }
    };

    if let Err(e) = result {
        credvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
