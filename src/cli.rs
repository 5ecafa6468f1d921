use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::api::{self, DistributionRepo};
use crate::core::finance::Money;
use crate::core::planning::Record;
use crate::storage::FileSystem;

#[derive(Parser)]
#[clap(name = "marea", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Storage root; defaults to ~/.marea
    #[clap(long)]
    storage: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Settle a closed period against the configured profile
    Settle {
        /// Total income of the period, in major currency units
        #[clap(long)]
        income: Decimal,

        /// Total expense of the period, in major currency units
        #[clap(long)]
        expense: Decimal,

        /// Skip the profile and report the net result
        #[clap(long)]
        no_calculation: bool,
    },

    /// Show the configured profile
    Profile,

    /// List stored distribution snapshots, newest first
    History {
        /// Resume listing after this snapshot id
        #[clap(long)]
        from: Option<String>,

        #[clap(long, default_value_t = 10)]
        limit: usize,
    },

    /// Show one stored snapshot
    Show { id: String },
}

fn storage_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".marea")
}

/// Runs the cli against the filesystem storage.
///
/// # Errors
/// Returns a message when storage cannot be initialized or a snapshot cannot
/// be written.
pub fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let repo = FileSystem::init(cli.storage.unwrap_or_else(storage_root))?;

    match cli.command {
        Commands::Settle {
            income,
            expense,
            no_calculation,
        } => {
            let mut record = Record::new(
                Money::from_major(income),
                Money::from_major(expense),
                api::get_profile(&repo),
            );
            if no_calculation {
                record = record.without_calculation();
            }
            let distribution = api::settle(&record);
            println!("{distribution}");
            let id = api::save_snapshot(distribution, &repo).map_err(|e| e.to_string())?;
            println!("Saved as {id}");
        }
        Commands::Profile => match api::get_profile(&repo) {
            Some(profile) => println!("{profile}"),
            None => println!("No readable profile at {}", repo.location()),
        },
        Commands::History { from, limit } => {
            let page = api::snapshot_ids(&repo, from, limit);
            for id in page.iter() {
                println!("{id}");
            }
            if let Some(cursor) = page.next_cursor {
                println!("... continue with --from {cursor}");
            }
        }
        Commands::Show { id } => match api::snapshot_by_id(&repo, &id) {
            Some(snapshot) => println!("{snapshot}"),
            None => println!("No snapshot {id}"),
        },
    }
    Ok(())
}
