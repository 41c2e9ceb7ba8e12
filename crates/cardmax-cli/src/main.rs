//! cardmax CLI - Payment-card reward recommendation engine
//!
//! Usage:
//!   cardmax classify "dinner at a ramen place"   Classify a purchase
//!   cardmax recommend -c catalog.json --category Dining -a 120
//!   cardmax gaps -c catalog.json --card everyday --card foodie
//!   cardmax record -u me --card foodie --category Dining -a 85.50

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Classify {
            description,
            method,
            json,
        } => commands::cmd_classify(&description, method, json).await,
        Commands::Recommend {
            catalog,
            category,
            description,
            amount,
            date,
            user,
            top,
        } => {
            commands::cmd_recommend(
                &cli.db,
                &catalog,
                category,
                description,
                amount,
                date,
                user,
                top,
            )
            .await
        }
        Commands::Gaps {
            catalog,
            cards,
            user,
            category,
            date,
        } => {
            commands::cmd_gaps(
                &cli.db,
                &catalog,
                &cards,
                user.as_deref(),
                category.as_deref(),
                date,
            )
            .await
        }
        Commands::Record {
            user,
            card,
            category,
            amount,
            date,
        } => commands::cmd_record(&cli.db, &user, &card, &category, amount, date),
        Commands::Own { user, card } => commands::cmd_own(&cli.db, &user, &card),
    }
}
