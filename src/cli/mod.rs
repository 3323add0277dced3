pub mod commands;
pub mod context;
pub mod output;

use clap::{Args, Parser, Subcommand};

use crate::core::errors::Result;
use crate::core::models::filter::FilterCriteria;

/// Customers, technicians and maintenance dates for a pool-service business.
#[derive(Parser, Debug)]
#[command(name = "poolboard", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project directory (default: .poolboard)
    #[arg(long, global = true, env = "POOLBOARD_DIR")]
    pub dir: Option<String>,

    /// Name recorded in the audit log for changes
    #[arg(long, global = true, env = "POOLBOARD_ACTOR")]
    pub actor: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode: only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the project directory, config and database
    Init,

    /// Show customers as a paginated table
    List {
        #[command(flatten)]
        filters: FilterArgs,
        /// Page to show (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Rows per page (default from config)
        #[arg(long)]
        page_size: Option<usize>,
        /// Print the available filter choices instead of rows
        #[arg(long)]
        options: bool,
        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a new customer
    Add {
        /// Customer name (unique, case-insensitive)
        name: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        technician: Option<String>,
        #[arg(long)]
        route_value: Option<String>,
        #[arg(long)]
        filter_type: Option<String>,
        #[arg(long)]
        filter_value: Option<String>,
        /// Last service date (DD/MM/YYYY or YYYY-MM-DD)
        #[arg(long)]
        last_service: Option<String>,
        /// Next service date (DD/MM/YYYY or YYYY-MM-DD)
        #[arg(long)]
        next_service: Option<String>,
    },

    /// Change one or more fields: poolboard update "Casa Azul" status=Lead technician=Pedro
    Update {
        /// Customer name
        name: String,
        /// field=value pairs
        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// Rename a customer
    Rename {
        /// Current name
        old: String,
        /// New name
        new: String,
    },

    /// Write the filtered customers as delimited text
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output file (default: export.file_name from config)
        #[arg(long, short)]
        output: Option<String>,
        /// Write to stdout instead of a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },

    /// Show headline numbers and breakdowns
    Stats,

    /// List the known technicians
    Techs,

    /// Show change history
    Log {
        /// Only entries for this customer
        #[arg(long)]
        customer: Option<String>,
        /// Filter entries since this date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        since: Option<String>,
        /// Show last N entries
        #[arg(long)]
        last: Option<usize>,
    },

    /// Manage the database schema version
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },

    /// Import customers from the legacy spreadsheet report
    Import {
        /// Legacy CSV customer report
        #[arg(long)]
        csv: String,
        /// Legacy JSON side store (data_storage.json)
        #[arg(long)]
        json: Option<String>,
    },

    /// Re-normalize every stored technician name
    NormalizeTechs {
        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Create, list or restore database backups
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Show the current and latest schema versions
    Status,
    /// Apply pending migrations
    Up {
        /// Stop at this version (default: latest)
        #[arg(long)]
        to: Option<i64>,
    },
    /// Revert migrations down to a version
    Down {
        /// Version to end at (0 removes everything)
        #[arg(long)]
        to: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum BackupAction {
    /// Copy the database into the backup directory
    Create,
    /// List available backups
    List,
    /// Replace the database with a verified backup
    Restore {
        /// Backup file name, as shown by 'backup list'
        file: String,
    },
}

/// Filter selections shared by `list` and `export`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Status to show, or "all"
    #[arg(long)]
    pub status: Option<String>,
    /// Technician to show, "unassigned", or "all"
    #[arg(long)]
    pub technician: Option<String>,
    /// Month (1-12) of the last or next service, or "all"
    #[arg(long)]
    pub month: Option<String>,
    /// Case-insensitive text to find in customer names
    #[arg(long)]
    pub search: Option<String>,
}

impl FilterArgs {
    pub fn criteria(&self) -> Result<FilterCriteria> {
        Ok(FilterCriteria {
            status: self.status.as_deref().map(str::parse).transpose()?.unwrap_or_default(),
            technician: self
                .technician
                .as_deref()
                .map(str::parse)
                .transpose()?
                .unwrap_or_default(),
            month: self.month.as_deref().map(str::parse).transpose()?.unwrap_or_default(),
            search: self.search.clone(),
        })
    }
}
