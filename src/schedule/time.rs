use crate::error::{schedule_error, SyncResult};
use chrono::{
    DateTime, FixedOffset, Month, NaiveDateTime, SecondsFormat, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;

/// chrono format of a joined "Day Date Time Year" string, e.g. "Sun September 11 1:00 PM 2022"
pub const SCHEDULE_FORMAT: &str = "%a %B %d %I:%M %p %Y";

/// Season year and the fixed offset the schedule's wall times are written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonCalendar {
    pub season_year: i32,
    pub source_offset: FixedOffset,
}

impl SeasonCalendar {
    pub fn new(season_year: i32, source_offset: FixedOffset) -> Self {
        Self {
            season_year,
            source_offset,
        }
    }

    /// Calendar year of a "Month Day" date text within this season
    pub fn year_for(&self, date_text: &str) -> SyncResult<i32> {
        season_year_for_month(date_text, self.season_year).ok_or_else(|| {
            schedule_error(&format!(
                "Month of '{}' is outside the {} season (September to January)",
                date_text.trim(),
                self.season_year
            ))
        })
    }
}

/// Resolve the year of a month within a season.
///
/// September through December belong to the season year, January to the
/// following one. Any other month has no year.
pub fn season_year_for_month(date_text: &str, season_year: i32) -> Option<i32> {
    let month = date_text.split_whitespace().next()?.parse::<Month>().ok()?;
    match month {
        Month::September | Month::October | Month::November | Month::December => Some(season_year),
        Month::January => Some(season_year + 1),
        _ => None,
    }
}

/// Turn a schedule row's day, date and time text into a UTC instant
pub fn normalize_start(
    day: &str,
    date: &str,
    time: &str,
    season: &SeasonCalendar,
) -> SyncResult<DateTime<Utc>> {
    let year = season.year_for(date)?;
    let text = format!("{} {} {} {}", day.trim(), date.trim(), time.trim(), year);

    let naive = NaiveDateTime::parse_from_str(&text, SCHEDULE_FORMAT)
        .map_err(|e| schedule_error(&format!("Failed to parse '{}': {}", text, e)))?;

    let local = season
        .source_offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| schedule_error(&format!("Invalid local time '{}'", text)))?;

    Ok(local.with_timezone(&Utc))
}

/// Read the wall time of an instant at `source` again as local time in `zone`.
///
/// The fixed source offset only matches the zone outside daylight saving.
/// Wall times repeated by a clock change take the earlier instant.
pub fn resolve_in_zone(
    instant: DateTime<Utc>,
    source: FixedOffset,
    zone: Tz,
) -> SyncResult<DateTime<Utc>> {
    let wall = instant.with_timezone(&source).naive_local();
    zone.from_local_datetime(&wall)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| schedule_error(&format!("{} does not exist in {}", wall, zone.name())))
}

/// Shift an instant by a whole number of hours
pub fn add_hours(instant: DateTime<Utc>, hours: i64) -> SyncResult<DateTime<Utc>> {
    TimeDelta::try_hours(hours)
        .and_then(|delta| instant.checked_add_signed(delta))
        .ok_or_else(|| {
            schedule_error(&format!(
                "Shifting {} by {} hours is out of range",
                format_instant(instant),
                hours
            ))
        })
}

/// RFC 3339 text with a `Z` suffix, to the second
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse RFC 3339 text with any offset into a UTC instant
pub fn parse_instant(text: &str) -> SyncResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| schedule_error(&format!("Failed to parse instant '{}': {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eastern(season_year: i32) -> SeasonCalendar {
        SeasonCalendar::new(season_year, FixedOffset::west_opt(5 * 3600).unwrap())
    }

    #[test]
    fn test_season_year_for_month() {
        for month in ["September 11", "October 2", "November 13", "December 25"] {
            assert_eq!(season_year_for_month(month, 2022), Some(2022), "{}", month);
        }
        assert_eq!(season_year_for_month("January 8", 2022), Some(2023));

        // Outside the table
        assert_eq!(season_year_for_month("February 12", 2022), None);
        assert_eq!(season_year_for_month("August 14", 2022), None);
        assert_eq!(season_year_for_month("Smarch 1", 2022), None);
        assert_eq!(season_year_for_month("", 2022), None);
    }

    #[test]
    fn test_normalize_start() {
        let start = normalize_start("Sun", "September 11", "1:00 PM", &eastern(2022)).unwrap();
        let expected = DateTime::parse_from_rfc3339("2022-09-11T13:00:00-05:00").unwrap();
        assert_eq!(start, expected);
        assert_eq!(format_instant(start), "2022-09-11T18:00:00Z");

        // Evening kickoff
        let start = normalize_start("Thu", "September 8", "8:20 PM", &eastern(2022)).unwrap();
        assert_eq!(format_instant(start), "2022-09-09T01:20:00Z");
    }

    #[test]
    fn test_normalize_start_rolls_over_to_next_year() {
        let start = normalize_start("Sun", "January 8", "4:25 PM", &eastern(2022)).unwrap();
        assert_eq!(format_instant(start), "2023-01-08T21:25:00Z");
    }

    #[test]
    fn test_normalize_start_errors() {
        let season = eastern(2022);

        // Month without a season year
        let err = normalize_start("Sun", "February 12", "6:30 PM", &season).unwrap_err();
        assert!(err.to_string().contains("February 12"));

        // Weekday disagrees with the date
        assert!(normalize_start("Mon", "September 11", "1:00 PM", &season).is_err());

        // Malformed time
        assert!(normalize_start("Sun", "September 11", "13 o'clock", &season).is_err());
    }

    #[test]
    fn test_add_hours() {
        let start = normalize_start("Sun", "September 11", "1:00 PM", &eastern(2022)).unwrap();

        let adjusted = add_hours(start, 4).unwrap();
        let end = add_hours(adjusted, 3).unwrap();
        assert_eq!(end - adjusted, TimeDelta::hours(3));
        assert_eq!(format_instant(adjusted), "2022-09-11T22:00:00Z");

        // Chained shifts equal one combined shift
        for (a, b) in [(4, 3), (-5, 2), (0, 24), (23, -23)] {
            let chained = add_hours(add_hours(start, a).unwrap(), b).unwrap();
            assert_eq!(chained, add_hours(start, a + b).unwrap());
        }

        // Crossing midnight is fine
        let late = normalize_start("Mon", "September 12", "8:15 PM", &eastern(2022)).unwrap();
        assert_eq!(format_instant(add_hours(late, 3).unwrap()), "2022-09-13T04:15:00Z");
    }

    #[test]
    fn test_add_hours_out_of_range() {
        let start = normalize_start("Sun", "September 11", "1:00 PM", &eastern(2022)).unwrap();

        assert!(add_hours(start, 9_999_999_999_999_999).is_err());
        assert!(add_hours(start, i64::MIN).is_err());
        // Representable delta, unrepresentable result
        assert!(add_hours(start, 3_000_000_000).is_err());
    }

    #[test]
    fn test_resolve_in_zone_follows_daylight_saving() {
        let zone = chrono_tz::America::New_York;
        let source = eastern(2022).source_offset;
        let resolve = |day, date, time| {
            let start = normalize_start(day, date, time, &eastern(2022)).unwrap();
            format_instant(resolve_in_zone(start, source, zone).unwrap())
        };

        // EDT
        assert_eq!(resolve("Sun", "September 11", "1:00 PM"), "2022-09-11T17:00:00Z");
        assert_eq!(resolve("Thu", "September 8", "8:20 PM"), "2022-09-09T00:20:00Z");
        // EST
        assert_eq!(resolve("Sun", "December 11", "1:00 PM"), "2022-12-11T18:00:00Z");
        assert_eq!(resolve("Sun", "January 8", "4:25 PM"), "2023-01-08T21:25:00Z");

        // Same zone as the source leaves the instant alone
        let start = normalize_start("Sun", "September 11", "1:00 PM", &eastern(2022)).unwrap();
        let fixed_zone = chrono_tz::Etc::GMTPlus5;
        assert_eq!(resolve_in_zone(start, source, fixed_zone).unwrap(), start);
    }

    #[test]
    fn test_instant_round_trip() {
        let start = normalize_start("Sun", "January 8", "1:00 PM", &eastern(2022)).unwrap();
        assert_eq!(parse_instant(&format_instant(start)).unwrap(), start);

        // Offsets in API responses normalize to UTC
        let parsed = parse_instant("2022-09-11T13:00:00-04:00").unwrap();
        assert_eq!(format_instant(parsed), "2022-09-11T17:00:00Z");

        assert!(parse_instant("September 11").is_err());
    }
}
