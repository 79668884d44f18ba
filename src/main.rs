//! storefront - terminal client for the storefront backend.
//!
//! This is the main entry point for the storefront CLI. It provides:
//!
//! - An interactive shell that takes cart instructions (`storefront shell`)
//! - Cart, session and catalog commands for scripting
//! - Maintenance of the local offline cache (`storefront cache ...`)
//!
//! See `storefront --help` for full usage information.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storefront::config::Config;
use storefront::logging::{LogConfig, init_logging};

mod commands;

const AFTER_HELP: &str = "\
COMMON WORKFLOWS:
  # Log in and shop from the terminal
  storefront login alice
  storefront shell
  > agregar laptop 2
  > quitar mouse
  > pagar

  # Inspect local state
  storefront cart show
  storefront cache info

EXAMPLES:
  storefront catalog laptop         List products matching 'laptop'
  storefront cache sweep            Remove expired cache entries
  storefront whoami                 Revalidate and show the session

Set STOREFRONT_API_URL to point at a different backend.";

#[derive(Parser)]
#[command(name = "storefront")]
#[command(version)]
#[command(about = "Offline-aware storefront client")]
#[command(after_help = AFTER_HELP)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config.toml (default: <config dir>/storefront/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose/debug output for any command
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive cart assistant
    ///
    /// Reads one instruction per line and applies it to the cart while the
    /// cart is kept in sync with the server in the background.
    ///
    /// Examples:
    ///   storefront shell
    ///   > agregar laptop 2         # add two of the only "laptop"
    ///   > 1                        # pick a candidate after a question
    ///   > :cart                    # show the cart
    ///   > :quit
    Shell,
    /// Show or clear the local cart
    ///
    /// Examples:
    ///   storefront cart show
    ///   storefront cart clear
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the offline request cache
    ///
    /// Examples:
    ///   storefront cache info      # Count fresh, stale and corrupt entries
    ///   storefront cache sweep     # Remove expired entries
    ///   storefront cache clear     # Remove all cached entries
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Log in and persist the session
    ///
    /// Examples:
    ///   storefront login alice     # Prompts for the password
    Login {
        username: String,
        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and log in
    Register {
        username: String,
        email: String,
        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// End the session (the cart is kept)
    Logout,
    /// Revalidate the session and show the current user
    Whoami,
    /// List products through the offline cache
    ///
    /// Examples:
    ///   storefront catalog         # All products
    ///   storefront catalog laptop  # Products whose name matches every word
    ///   storefront catalog --refresh
    Catalog {
        /// Words every listed product name must contain
        filter: Vec<String>,
        /// Bypass the cache and fail if the backend is unreachable
        #[arg(long)]
        refresh: bool,
    },
    /// Create a payment session for the current cart
    Checkout,
}

#[derive(Subcommand)]
pub(crate) enum CartAction {
    /// Print cart lines and subtotal
    Show,
    /// Empty the cart (also on the server when logged in)
    Clear,
}

#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Show cache statistics
    Info,
    /// Remove expired and corrupt entries
    Sweep,
    /// Remove every cached entry
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let log_config = if cli.verbose {
        LogConfig::development()
    } else {
        config.log_config()
    };
    init_logging(&log_config);

    match cli.command {
        Commands::Shell => {
            commands::shell::execute(config).await?;
        },
        Commands::Cart { action } => {
            commands::cart::execute(config, action).await?;
        },
        Commands::Cache { action } => {
            commands::cache::execute(&config, action)?;
        },
        Commands::Login { username, password } => {
            commands::session::login(config, &username, password).await?;
        },
        Commands::Register {
            username,
            email,
            password,
        } => {
            commands::session::register(config, username, email, password).await?;
        },
        Commands::Logout => {
            commands::session::logout(config).await?;
        },
        Commands::Whoami => {
            commands::session::whoami(config).await?;
        },
        Commands::Catalog { filter, refresh } => {
            commands::catalog::execute(config, &filter, refresh).await?;
        },
        Commands::Checkout => {
            commands::cart::checkout(config).await?;
        },
    }

    Ok(())
}
