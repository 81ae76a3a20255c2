pub mod analyze;
pub mod categories;
pub mod files;
pub mod import;
pub mod init;
pub mod status;
pub mod tasks;

use clap::{Parser, Subcommand};

use crate::db::get_connection;
use crate::error::{IntakeError, Result};
use crate::settings::{load_settings, Settings};
use crate::store::SqliteStore;

/// Open the configured database as a store. Fails if `init` has not run.
pub(crate) fn open_store(settings: &Settings) -> Result<SqliteStore> {
    let db_path = settings.db_path();
    if !db_path.exists() {
        return Err(IntakeError::Settings(format!(
            "no database at {}; run `intake init` first",
            db_path.display()
        )));
    }
    Ok(SqliteStore::new(get_connection(&db_path)?))
}

pub(crate) fn open_configured() -> Result<(Settings, SqliteStore)> {
    let settings = load_settings();
    let store = open_store(&settings)?;
    Ok((settings, store))
}

#[derive(Parser)]
#[command(name = "intake", about = "Business document intake: cash-flow analysis and onboarding tasks.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up intake: choose a data directory and business, initialize the database.
    Init {
        /// Path for intake data (default: ~/Documents/intake)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Business id (UUID). A new one is generated if none is configured.
        #[arg(long)]
        business: Option<String>,
        /// Owner/user id (UUID). A new one is generated if none is configured.
        #[arg(long)]
        owner: Option<String>,
    },
    /// Import a cash-flow CSV as an uploaded document.
    Import {
        /// Path to the CSV file
        file: String,
        /// Onboarding task this document satisfies
        #[arg(long)]
        task: Option<i64>,
        /// Fail instead of skipping lines with unknown categories
        #[arg(long)]
        strict: bool,
    },
    /// Manage uploaded documents.
    Files {
        #[command(subcommand)]
        command: FilesCommands,
    },
    /// Show the pivoted cash-flow analysis for a document.
    Analyze {
        /// Uploaded file id (default: last analyzed, else latest processed)
        #[arg(long)]
        file: Option<i64>,
    },
    /// Manage cash-flow categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Onboarding tasks and their completion.
    Tasks {
        #[command(subcommand)]
        command: TasksCommands,
    },
    /// Show current configuration and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum FilesCommands {
    /// List uploaded documents for the business.
    List {
        /// Only files in this status (uploading, parsing, processed, error, pending)
        #[arg(long)]
        status: Option<String>,
        /// Only files uploaded by the configured owner
        #[arg(long)]
        mine: bool,
    },
    /// Soft-delete an uploaded document.
    Delete {
        /// Uploaded file id
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// List cash-flow categories.
    List,
    /// Add a cash-flow category.
    Add {
        /// Category name
        name: String,
        /// income, expense, debt or other
        #[arg(long = "type")]
        category_type: String,
    },
}

#[derive(Subcommand)]
pub enum TasksCommands {
    /// List tasks grouped by category with completion.
    List,
    /// Add an onboarding task.
    Add {
        /// Task name
        name: String,
        #[arg(long)]
        category: Option<String>,
        /// upload or survey
        #[arg(long = "type", default_value = "upload")]
        task_type: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Save a survey answer for a task.
    Respond {
        /// Task id
        task: i64,
        /// Answer text (empty clears completion)
        value: String,
    },
}
