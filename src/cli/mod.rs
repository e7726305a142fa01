pub mod categories;
pub mod confirm;
pub mod export;
pub mod imports;
pub mod init;
pub mod ledger;
pub mod recurring;
pub mod review;
pub mod rules;
pub mod status;
pub mod upload;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{CardbookError, Result};
use crate::models::Provider;
use crate::settings::{load_settings, Settings};

/// Open the configured database. Commands other than `init` need it to exist.
pub(crate) fn open() -> Result<(Settings, Connection)> {
    let settings = load_settings();
    let db_path = settings.db_path();
    if !db_path.exists() {
        return Err(CardbookError::Settings(format!(
            "database not found at {}, run `cardbook init` first",
            db_path.display()
        )));
    }
    let conn = get_connection(&db_path)?;
    Ok((settings, conn))
}

pub(crate) fn provider_arg(raw: Option<&str>) -> Result<Option<Provider>> {
    raw.map(Provider::from_key).transpose()
}

#[derive(Parser)]
#[command(name = "cardbook", about = "Card statement import and review for a household ledger.")]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and household, and initialize the database.
    Init {
        /// Path for cardbook data (default: ~/Documents/cardbook)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Household the ledger belongs to
        #[arg(long)]
        household: Option<String>,
    },
    /// Show current database and summary statistics.
    Status,
    /// Manage categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Manage keyword mapping rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Upload a card statement (CSV/XLSX/XLS/ODS) for review.
    Upload {
        /// Path to the statement file
        file: String,
        /// Statement month: YYYY-MM
        #[arg(long)]
        month: String,
        /// Whose card this is (default from settings)
        #[arg(long)]
        person: Option<String>,
        /// Card provider: samsung, kb, other (default: detect)
        #[arg(long)]
        provider: Option<String>,
    },
    /// List, inspect and discard uploaded statements.
    Imports {
        #[command(subcommand)]
        command: ImportsCommands,
    },
    /// Adjust rows of a statement under review.
    Review {
        #[command(subcommand)]
        command: ReviewCommands,
    },
    /// Confirm a reviewed statement into the ledger.
    Confirm {
        /// Import ID (shown in `cardbook imports list`)
        import: i64,
    },
    /// List ledger entries, newest first.
    Ledger {
        /// Maximum number of entries to show
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Manage fixed monthly expenses.
    Recurring {
        #[command(subcommand)]
        command: RecurringCommands,
    },
    /// Export ledger data.
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a category.
    Add {
        name: String,
        /// Person the category belongs to
        #[arg(long)]
        person: Option<String>,
    },
    /// List categories.
    List,
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add a mapping rule.
    Add {
        /// Keyword matched case-insensitively inside merchant names
        keyword: String,
        /// Category name to assign
        #[arg(long)]
        category: String,
        /// Rule priority (higher wins)
        #[arg(long, default_value = "0")]
        priority: i64,
    },
    /// List mapping rules.
    List,
    /// Update an existing rule.
    Update {
        /// Rule ID (shown in `cardbook rules list`)
        id: i64,
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        priority: Option<i64>,
    },
    /// Delete a rule by ID.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum ImportsCommands {
    /// List recent imports.
    List,
    /// Show the rows of an import.
    Show {
        id: i64,
        /// Also print each row's original spreadsheet cells
        #[arg(long)]
        raw: bool,
    },
    /// Discard an import that is still under review.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum ReviewCommands {
    /// Assign a category to a row.
    Category {
        /// Row ID (shown in `cardbook imports show`)
        row: i64,
        /// Category name
        category: String,
    },
    /// Leave a row out of the ledger.
    Exclude { row: i64 },
    /// Put an excluded row back.
    Include { row: i64 },
    /// Save the row's merchant as a mapping rule.
    SaveRule {
        row: i64,
        /// Category name (default: the row's current category)
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum RecurringCommands {
    /// Add a fixed monthly expense.
    Add {
        name: String,
        #[arg(long)]
        amount: u64,
        #[arg(long)]
        person: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// List fixed expenses.
    List,
    /// Stop generating an item.
    Pause { id: i64 },
    /// Resume generating an item.
    Resume { id: i64 },
    /// Show which items were already generated for a month.
    Check {
        /// Month: YYYY-MM
        #[arg(long)]
        month: String,
        /// Item IDs (default: all active items)
        ids: Vec<i64>,
    },
    /// Generate ledger entries for a month.
    Generate {
        /// Month: YYYY-MM
        #[arg(long)]
        month: String,
        /// Item IDs (default: all active items)
        ids: Vec<i64>,
    },
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Export ledger transactions as CSV.
    Transactions {
        /// Output file path (default: stdout)
        #[arg(long)]
        output: Option<String>,
    },
}
