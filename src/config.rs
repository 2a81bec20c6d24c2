use crate::error::{config_error, env_error, SyncResult};
use crate::schedule::teams::TeamColors;
use crate::schedule::time::SeasonCalendar;
use chrono::FixedOffset;
use chrono_tz::Tz;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

/// Default schedule CSV location
pub const DEFAULT_SCHEDULE_FILE: &str = "nfl_schedule.csv";
/// Default team color table location
pub const DEFAULT_TEAMS_FILE: &str = "config/teams.toml";
/// Default persisted OAuth token location
pub const DEFAULT_TOKEN_FILE: &str = "token.json";
/// Default OAuth client secret location
pub const DEFAULT_CLIENT_SECRET_FILE: &str = "credentials.json";
/// Timezone of the schedule's kickoff times
pub const DEFAULT_EVENT_TIMEZONE: &str = "America/New_York";

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// Google Calendar ID events are written to
    pub google_calendar_id: String,
    /// Year the season starts in
    pub season_year: i32,
    /// Schedule CSV path
    pub schedule_file: PathBuf,
    /// Persisted OAuth token path
    pub token_file: PathBuf,
    /// OAuth client secret path (installed app JSON)
    pub client_secret_file: PathBuf,
    /// IANA timezone kickoff wall times are read in, and sent with every event
    pub event_timezone: String,
    /// Fixed UTC offset schedule rows are first normalized at
    pub source_utc_offset_hours: i32,
    /// Correction applied to every parsed start time
    pub start_correction_hours: i64,
    /// Length of each created event
    pub event_duration_hours: i64,
    /// Pause between successive inserts
    pub insert_delay_ms: u64,
    /// Skip rows whose event already exists on the calendar
    pub skip_existing: bool,
    /// Home team to color id
    pub teams: TeamColors,
}

impl Config {
    /// Load configuration from environment and the teams file
    pub fn load() -> SyncResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let mut config = Self::from_vars(|key| env::var(key).ok())?;

        let teams_file =
            env::var("TEAMS_FILE").unwrap_or_else(|_| String::from(DEFAULT_TEAMS_FILE));
        config.teams = TeamColors::load(&teams_file)?;
        debug!("Loaded {} team colors from {}", config.teams.len(), teams_file);

        Ok(config)
    }

    /// Build configuration from a variable lookup, leaving the team table empty
    pub fn from_vars<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let google_calendar_id =
            lookup("GOOGLE_CALENDAR_ID").ok_or_else(|| env_error("GOOGLE_CALENDAR_ID"))?;
        let season_year = lookup("SEASON_YEAR")
            .ok_or_else(|| env_error("SEASON_YEAR"))?
            .trim()
            .parse::<i32>()
            .map_err(|_| config_error("Invalid SEASON_YEAR format"))?;

        let path = |key: &str, default: &str| {
            PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()))
        };
        let schedule_file = path("SCHEDULE_FILE", DEFAULT_SCHEDULE_FILE);
        let token_file = path("TOKEN_FILE", DEFAULT_TOKEN_FILE);
        let client_secret_file = path("CLIENT_SECRET_FILE", DEFAULT_CLIENT_SECRET_FILE);

        let event_timezone = lookup("EVENT_TIMEZONE")
            .unwrap_or_else(|| String::from(DEFAULT_EVENT_TIMEZONE));
        Tz::from_str(&event_timezone)
            .map_err(|_| config_error(&format!("Unknown EVENT_TIMEZONE '{}'", event_timezone)))?;

        let source_utc_offset_hours = parse_or(&lookup, "SOURCE_UTC_OFFSET_HOURS", -5)?;
        if !(-23..=23).contains(&source_utc_offset_hours) {
            return Err(config_error("SOURCE_UTC_OFFSET_HOURS must be between -23 and 23"));
        }

        let start_correction_hours = parse_or(&lookup, "START_CORRECTION_HOURS", 0)?;
        if !(-23..=23).contains(&start_correction_hours) {
            return Err(config_error("START_CORRECTION_HOURS must be between -23 and 23"));
        }

        let event_duration_hours = parse_or(&lookup, "EVENT_DURATION_HOURS", 3)?;
        if !(1..=24).contains(&event_duration_hours) {
            return Err(config_error("EVENT_DURATION_HOURS must be between 1 and 24"));
        }

        Ok(Config {
            google_calendar_id,
            season_year,
            schedule_file,
            token_file,
            client_secret_file,
            event_timezone,
            source_utc_offset_hours,
            start_correction_hours,
            event_duration_hours,
            insert_delay_ms: parse_or(&lookup, "INSERT_DELAY_MS", 1000)?,
            skip_existing: parse_or(&lookup, "SKIP_EXISTING", true)?,
            teams: TeamColors::default(),
        })
    }

    /// Season year and source offset used to normalize schedule rows
    pub fn season(&self) -> SyncResult<SeasonCalendar> {
        let offset = FixedOffset::east_opt(self.source_utc_offset_hours * 3600)
            .ok_or_else(|| config_error("Invalid SOURCE_UTC_OFFSET_HOURS"))?;
        Ok(SeasonCalendar::new(self.season_year, offset))
    }
}

/// Token and client secret locations, the only settings authorization needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFiles {
    pub token_file: PathBuf,
    pub client_secret_file: PathBuf,
}

impl TokenFiles {
    pub fn load() -> Self {
        dotenv().ok();
        Self {
            token_file: env::var("TOKEN_FILE")
                .unwrap_or_else(|_| String::from(DEFAULT_TOKEN_FILE))
                .into(),
            client_secret_file: env::var("CLIENT_SECRET_FILE")
                .unwrap_or_else(|_| String::from(DEFAULT_CLIENT_SECRET_FILE))
                .into(),
        }
    }
}

/// Parse an optional variable, falling back to a default when unset
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> SyncResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| config_error(&format!("Invalid {} format", key))),
        None => Ok(default),
    }
}
