// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use scout_runtime::cli;
use scout_runtime::cli::{FilterArgs, SessionArgs};

#[derive(Parser)]
#[command(
    name = "scout",
    about = "Scout: browse a content portal's catalog through a real browser",
    version,
    after_help = "Run 'scout <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load one catalog page and list its items
    Browse {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Fetch one item's detail record
    Details {
        /// Item id
        id: String,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Sign in and keep the session in the browser profile
    Login {
        /// Credential slot to sign in with
        #[arg(long)]
        account: Option<u32>,
        /// Show the browser window
        #[arg(long)]
        headful: bool,
    },
    /// Print the catalog query URL for a set of filters
    Url {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Manage stored credentials
    Credentials {
        #[command(subcommand)]
        action: CredentialsAction,
    },
    /// Fetch preview images through the asset cache
    Preview {
        /// Image URLs
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CredentialsAction {
    /// Store a login/secret pair for an account slot
    Set {
        /// Account slot
        #[arg(long, default_value = "6")]
        account: u32,
        /// Login name
        #[arg(long)]
        login: String,
        /// Secret (read from SCOUT_SECRET or stdin when omitted)
        #[arg(long)]
        secret: Option<String>,
    },
    /// List stored account slots
    List,
    /// Delete the credentials of an account slot
    Delete {
        /// Account slot
        account: u32,
    },
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var("SCOUT_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("SCOUT_QUIET", "1");
    }
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Browse { filters, session } => cli::browse_cmd::run(filters, &session).await,
        Commands::Details { id, session } => cli::details_cmd::run(&id, &session).await,
        Commands::Login { account, headful } => {
            let session = SessionArgs {
                login: true,
                account,
                headful,
            };
            cli::login_cmd::run(&session).await
        }
        Commands::Url { filters } => cli::url_cmd::run(filters).await,
        Commands::Credentials { action } => match action {
            CredentialsAction::Set {
                account,
                login,
                secret,
            } => cli::credentials_cmd::run_set(account, &login, secret).await,
            CredentialsAction::List => cli::credentials_cmd::run_list().await,
            CredentialsAction::Delete { account } => cli::credentials_cmd::run_delete(account).await,
        },
        Commands::Preview { urls } => cli::preview_cmd::run(&urls).await,
        Commands::Doctor => cli::doctor::run().await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "scout", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !cli::output::is_quiet() && !cli::output::is_json() {
            eprintln!("  Error: {e:#}");
        }
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        }
        std::process::exit(1);
    }

    result
}
