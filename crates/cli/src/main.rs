//! Cloudberry CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! cb-cli migrate
//!
//! # Create a promo code
//! cb-cli promo create -c SAVE10 -k percentage -v 10 --min-order 1000 --max-uses 500
//!
//! # Deactivate a promo code
//! cb-cli promo deactivate -c SAVE10
//!
//! # List promo codes
//! cb-cli promo list
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `promo` - Manage promotional discount codes

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cb-cli")]
#[command(author, version, about = "Cloudberry CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage promo codes
    Promo {
        #[command(subcommand)]
        action: PromoAction,
    },
}

#[derive(Subcommand)]
enum PromoAction {
    /// Create a new promo code
    Create {
        /// The code customers enter at checkout (stored upper-case)
        #[arg(short, long)]
        code: String,

        /// Discount kind (`percentage`, `fixed`)
        #[arg(short, long)]
        kind: String,

        /// Percent (0-100) for percentage codes, minor units for fixed codes
        #[arg(short, long)]
        value: i64,

        /// Minimum order subtotal in minor units
        #[arg(long, default_value = "0")]
        min_order: i64,

        /// Maximum total redemptions
        #[arg(long)]
        max_uses: i32,

        /// Start of the validity window (RFC 3339; default: now)
        #[arg(long)]
        valid_from: Option<String>,

        /// End of the validity window (RFC 3339; default: one year from now)
        #[arg(long)]
        valid_until: Option<String>,
    },
    /// Deactivate a promo code
    Deactivate {
        /// The code to deactivate
        #[arg(short, long)]
        code: String,
    },
    /// List all promo codes
    List,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Promo { action } => match action {
            PromoAction::Create {
                code,
                kind,
                value,
                min_order,
                max_uses,
                valid_from,
                valid_until,
            } => {
                commands::promo::create(
                    &code,
                    &kind,
                    value,
                    min_order,
                    max_uses,
                    valid_from.as_deref(),
                    valid_until.as_deref(),
                )
                .await?;
            }
            PromoAction::Deactivate { code } => commands::promo::deactivate(&code).await?,
            PromoAction::List => commands::promo::list().await?,
        },
    }

    Ok(())
}
