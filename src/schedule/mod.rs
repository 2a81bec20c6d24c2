pub mod teams;
pub mod time;

pub use teams::{ColorId, TeamColors};
pub use time::SeasonCalendar;

use crate::error::{schedule_error, Error, SyncResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// One game as it appears in the schedule CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    #[serde(rename = "Day")]
    pub day: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "VisTm")]
    pub visiting_team: String,
    #[serde(rename = "HomeTm")]
    pub home_team: String,
}

impl ScheduleRow {
    /// Event title, "Visitor @ Home"
    pub fn summary(&self) -> String {
        format!("{} @ {}", self.visiting_team.trim(), self.home_team.trim())
    }

    /// Kickoff as a UTC instant
    pub fn start(&self, season: &SeasonCalendar) -> SyncResult<DateTime<Utc>> {
        time::normalize_start(&self.day, &self.date, &self.time, season)
    }
}

/// A schedule row with its normalized kickoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledGame {
    pub row: ScheduleRow,
    pub start: DateTime<Utc>,
}

/// Read and normalize the schedule CSV at `path`
pub fn load_schedule(path: impl AsRef<Path>, season: &SeasonCalendar) -> SyncResult<Vec<ScheduledGame>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        schedule_error(&format!("Failed to open schedule {}: {}", path.display(), e))
    })?;

    let games = read_schedule(file, season)?;
    info!("Loaded {} games from {}", games.len(), path.display());
    Ok(games)
}

/// Read and normalize schedule rows from any CSV source.
///
/// Every row is normalized before returning, so a malformed row fails the
/// whole load instead of leaving a half-processed schedule.
pub fn read_schedule<R: Read>(reader: R, season: &SeasonCalendar) -> SyncResult<Vec<ScheduledGame>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut games = Vec::new();
    for (index, record) in csv_reader.deserialize::<ScheduleRow>().enumerate() {
        // Header is line 1
        let line = index + 2;
        let row = record?;
        let start = row.start(season).map_err(|e| at_line(line, e))?;
        debug!("Line {}: {} at {}", line, row.summary(), time::format_instant(start));
        games.push(ScheduledGame { row, start });
    }

    Ok(games)
}

fn at_line(line: usize, err: Error) -> Error {
    match err {
        Error::Schedule(message) => Error::Schedule(format!("line {}: {}", line, message)),
        other => other,
    }
}
