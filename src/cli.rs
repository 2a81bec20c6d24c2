use clap::{Parser, Subcommand};

/// Sync a season schedule into Google Calendar
#[derive(Debug, Parser)]
#[command(name = "gameday", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Create an event for every game in the schedule (default)
    Sync {
        /// Print the events instead of creating them
        #[arg(long)]
        dry_run: bool,
    },
    /// Show upcoming events on the calendar
    List {
        /// Number of events to show
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=2500))]
        max: u32,
    },
    /// Delete every event on the calendar
    DeleteAll {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Show the event color palette
    Colors,
}

impl Cli {
    /// The selected command, defaulting to a real sync
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Sync { dry_run: false })
    }
}
