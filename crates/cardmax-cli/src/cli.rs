//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use cardmax_core::ClassifyMethod;

/// cardmax - Pick the right card for every purchase
#[derive(Parser)]
#[command(name = "cardmax")]
#[command(about = "Payment-card reward recommendation engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Spending ledger database path
    #[arg(long, default_value = "cardmax.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a purchase description into a spending category
    Classify {
        /// Purchase description, e.g. "weekly groceries at Whole Foods"
        description: String,

        /// Force a single tier: keyword, semantic, or generative
        #[arg(short, long)]
        method: Option<ClassifyMethod>,

        /// Emit the result as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Rank catalog cards for a purchase
    Recommend {
        /// Card catalog JSON file
        #[arg(short, long)]
        catalog: PathBuf,

        /// Spending category (classified from --description if omitted)
        #[arg(long)]
        category: Option<String>,

        /// Purchase description to classify when no --category is given
        #[arg(long)]
        description: Option<String>,

        /// Purchase amount; 0 ranks by rate alone
        #[arg(short, long, default_value = "0")]
        amount: f64,

        /// Purchase date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// User id for cap-aware rates (reads the ledger)
        #[arg(short, long)]
        user: Option<String>,

        /// Number of cards to show
        #[arg(long, default_value = "5")]
        top: usize,
    },

    /// Analyze portfolio gaps against the catalog
    Gaps {
        /// Card catalog JSON file
        #[arg(short, long)]
        catalog: PathBuf,

        /// Owned card id (repeatable); overrides ledger ownership
        #[arg(long = "card")]
        cards: Vec<String>,

        /// User id whose owned cards come from the ledger
        #[arg(short, long)]
        user: Option<String>,

        /// Compare a single category instead of the full scan
        #[arg(long)]
        category: Option<String>,

        /// Reference date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Append a purchase to the spending ledger
    Record {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Card the purchase was made on
        #[arg(long)]
        card: String,

        /// Spending category
        #[arg(long)]
        category: String,

        /// Purchase amount
        #[arg(short, long)]
        amount: f64,

        /// Purchase date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Mark a card as owned by a user
    Own {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Card id
        #[arg(long)]
        card: String,
    },
}
