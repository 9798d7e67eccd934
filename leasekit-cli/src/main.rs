//! Leasekit CLI
//!
//! Command-line access to the payment gateway, session tokens and field
//! encryption. Settings come from `LEASEKIT_*` environment variables.

use anyhow::Result;
use clap::{Parser, Subcommand};
use leasekit_lib::gateway::Channels;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

mod commands;
mod ui;

#[derive(Parser)]
#[command(name = "leasekit")]
#[command(about = "Leasekit CLI - payments, session tokens and field encryption", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue and check session tokens (needs LEASEKIT_TOKEN_SECRET)
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Encrypt a field value
    Encrypt {
        /// Plaintext value
        value: String,
    },

    /// Decrypt a stored field value
    Decrypt {
        /// Encrypted blob
        blob: String,
    },

    /// Check whether a value looks like an encrypted blob
    LooksEncrypted {
        /// Value to inspect
        value: String,
    },

    /// Collect payments through the aggregator
    Pay {
        #[command(subcommand)]
        action: PayAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a token
    Issue {
        /// Claim as key=value; JSON values keep their type (repeatable)
        #[arg(short, long = "claim")]
        claims: Vec<String>,

        /// Lifetime in seconds (at least 1)
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        lifetime: Option<u64>,
    },

    /// Verify a token and print its claims
    Verify {
        /// Token to verify
        token: String,
    },

    /// Extract the token from an Authorization header value
    Header {
        /// Header value, e.g. "Bearer eyJ..."
        value: String,
    },
}

#[derive(Subcommand)]
enum PayAction {
    /// Initiate a payment and print the checkout URL
    Init {
        /// Amount in the configured currency
        #[arg(short, long)]
        amount: Decimal,

        /// Transaction id (generated when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Payment description
        #[arg(short, long)]
        description: Option<String>,

        /// Allowed channels: ALL or a list such as MOBILE_MONEY,WALLET
        #[arg(long)]
        channels: Option<Channels>,
    },

    /// Check the status of a transaction
    Status {
        /// Transaction id
        transaction_id: String,
    },

    /// Check that gateway credentials are configured
    Configured,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the defaults
    let default_filter = if cli.verbose {
        "leasekit_cli=debug,leasekit_lib=debug"
    } else {
        "leasekit_cli=info,leasekit_lib=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Token { action } => match action {
            TokenAction::Issue { claims, lifetime } => {
                commands::token::issue(&claims, lifetime, cli.verbose)?;
            }
            TokenAction::Verify { token } => {
                commands::token::verify(&token)?;
            }
            TokenAction::Header { value } => {
                commands::token::header(&value)?;
            }
        },
        Commands::Encrypt { value } => {
            commands::crypt::encrypt(&value)?;
        }
        Commands::Decrypt { blob } => {
            commands::crypt::decrypt(&blob)?;
        }
        Commands::LooksEncrypted { value } => {
            commands::crypt::looks_encrypted(&value)?;
        }
        Commands::Pay { action } => match action {
            PayAction::Init {
                amount,
                id,
                description,
                channels,
            } => {
                commands::pay::init(amount, id, description, channels, cli.verbose).await?;
            }
            PayAction::Status { transaction_id } => {
                commands::pay::status(&transaction_id, cli.verbose).await?;
            }
            PayAction::Configured => {
                commands::pay::configured()?;
            }
        },
    }

    Ok(())
}
