use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(gameday::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(gameday::config))]
    Config(String),

    #[error("Schedule error: {0}")]
    #[diagnostic(
        code(gameday::schedule),
        help("Rows need Day, Date, Time, VisTm and HomeTm, e.g. \"Sun\", \"September 11\", \"1:00 PM\"")
    )]
    Schedule(String),

    #[error("No color configured for team '{0}'")]
    #[diagnostic(code(gameday::unknown_team), help("Add the team to the teams file"))]
    UnknownTeam(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(gameday::google_calendar))]
    GoogleCalendar(String),

    #[error("Google Calendar API returned HTTP {status}: {message}")]
    #[diagnostic(code(gameday::api))]
    Api { status: u16, message: String },

    #[error("Authorization error: {0}")]
    #[diagnostic(
        code(gameday::auth),
        help("Run get_calendar_token to create a fresh token file")
    )]
    Auth(String),

    #[error(transparent)]
    #[diagnostic(code(gameday::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(gameday::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(gameday::other))]
    Other(String),
}

impl Error {
    /// Whether this is an API error with the given HTTP status
    pub fn is_status(&self, code: u16) -> bool {
        matches!(self, Error::Api { status, .. } if *status == code)
    }
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// CSV errors only come from reading the schedule
impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Schedule(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type SyncResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create schedule errors
pub fn schedule_error(message: &str) -> Error {
    Error::Schedule(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create authorization errors
pub fn auth_error(message: &str) -> Error {
    Error::Auth(message.to_string())
}
