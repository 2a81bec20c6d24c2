use crate::cli::Commands;
use crate::config::Config;
use crate::error::{config_error, Error};
use crate::google_calendar::{GoogleCalendarClient, TokenManager};
use crate::schedule::load_schedule;
use crate::sync::{ScheduleSync, SyncSettings};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Token manager for the configured token and client secret files
pub fn token_manager(config: &Config) -> TokenManager {
    TokenManager::new(&config.token_file, &config.client_secret_file)
}

/// Run one command against the configured calendar
pub async fn run(config: Config, command: Commands) -> miette::Result<()> {
    let settings = SyncSettings::from_config(&config)?;
    let client = GoogleCalendarClient::new(
        config.google_calendar_id.clone(),
        Arc::new(token_manager(&config)),
    )?;
    info!("Using calendar {}", client.calendar_id());
    let sync = ScheduleSync::new(client, settings);

    match command {
        Commands::Sync { dry_run } => {
            let games = load_schedule(&config.schedule_file, &config.season()?)?;

            if dry_run {
                for event in sync.build_events(&games)? {
                    println!(
                        "{} | {} -> {} | color {}",
                        event.summary,
                        event.start.display(),
                        event.end.display(),
                        event.color_id
                    );
                }
                return Ok(());
            }

            let report = sync.create_events(&games).await?;
            for summary in &report.failed {
                error!("Not created: {}", summary);
            }
        }
        Commands::List { max } => {
            let events = sync.upcoming_events(Utc::now(), max).await?;
            if events.is_empty() {
                println!("No upcoming events found.");
            }
            for event in events {
                println!(
                    "{} {}",
                    event.start.display(),
                    event.summary.as_deref().unwrap_or("(no title)")
                );
            }
        }
        Commands::DeleteAll { yes } => {
            if !yes {
                return Err(config_error(
                    "delete-all removes every event on the calendar; pass --yes to confirm",
                )
                .into());
            }
            let report = sync.delete_all_events().await?;
            if !report.failed.is_empty() {
                error!("{} events could not be deleted", report.failed.len());
            }
        }
        Commands::Colors => {
            for (id, color) in sync.color_options().await?.0 {
                println!(
                    "colorId: {:>2} background {} foreground {}",
                    id, color.background, color.foreground
                );
            }
        }
    }

    Ok(())
}
