use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone, Utc};
use gameday::error::{Error, SyncResult};
use gameday::google_calendar::models::{ColorDefinition, ColorsResponse};
use gameday::google_calendar::{
    CalendarEvent, CalendarService, EventPalette, EventsPage, ListQuery, NewEvent,
};
use gameday::schedule::{load_schedule, ScheduledGame, SeasonCalendar, TeamColors};
use gameday::sync::{ScheduleSync, SyncSettings};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// In-memory calendar with failure injection
#[derive(Default)]
pub struct MockCalendar {
    /// (sequence, event), in insertion order
    events: Mutex<Vec<(usize, CalendarEvent)>>,
    next_seq: AtomicUsize,
    page_size: usize,
    failing_summaries: HashSet<String>,
    failing_ids: HashSet<String>,
    pub list_calls: AtomicUsize,
}

impl MockCalendar {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            ..Default::default()
        }
    }

    /// Reject inserts of events with this summary
    pub fn failing_insert(mut self, summary: &str) -> Self {
        self.failing_summaries.insert(summary.to_string());
        self
    }

    /// Reject deletes of this event id
    pub fn failing_delete(mut self, id: &str) -> Self {
        self.failing_ids.insert(id.to_string());
        self
    }

    pub fn events(&self) -> Vec<CalendarEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn summaries(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| event.summary)
            .collect()
    }
}

#[async_trait]
impl CalendarService for MockCalendar {
    async fn list_events(&self, query: &ListQuery) -> SyncResult<EventsPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        // Page tokens carry the last sequence number served
        let after: Option<usize> = match &query.page_token {
            Some(token) => Some(token.parse().map_err(|_| Error::Api {
                status: 400,
                message: "Invalid page token".to_string(),
            })?),
            None => None,
        };

        let mut matching: Vec<(usize, CalendarEvent)> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|(seq, _)| after.map_or(true, |after| *seq > after))
            .filter(|(_, event)| match (query.time_min, event.end.instant()) {
                (Some(min), Some(end)) => end > min,
                _ => true,
            })
            .cloned()
            .collect();

        if query.time_min.is_some() {
            matching.sort_by_key(|(_, event)| event.start.instant());
        }

        let limit = query
            .max_results
            .map(|max| max as usize)
            .unwrap_or(self.page_size)
            .min(self.page_size);
        let has_more = matching.len() > limit;
        matching.truncate(limit);

        let next_page_token = if has_more {
            matching.last().map(|(seq, _)| seq.to_string())
        } else {
            None
        };

        Ok(EventsPage {
            items: matching.into_iter().map(|(_, event)| event).collect(),
            next_page_token,
        })
    }

    async fn insert_event(&self, event: &NewEvent) -> SyncResult<CalendarEvent> {
        if self.failing_summaries.contains(&event.summary) {
            return Err(Error::Api {
                status: 403,
                message: "Rate Limit Exceeded".to_string(),
            });
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let created = CalendarEvent {
            id: format!("evt{}", seq),
            summary: Some(event.summary.clone()),
            status: Some("confirmed".to_string()),
            color_id: Some(event.color_id.clone()),
            start: event.start.clone(),
            end: event.end.clone(),
            ..Default::default()
        };
        self.events.lock().unwrap().push((seq, created.clone()));
        Ok(created)
    }

    async fn delete_event(&self, event_id: &str) -> SyncResult<()> {
        if self.failing_ids.contains(event_id) {
            return Err(Error::Api {
                status: 500,
                message: "Backend Error".to_string(),
            });
        }
        self.events.lock().unwrap().retain(|(_, event)| event.id != event_id);
        Ok(())
    }

    async fn event_colors(&self) -> SyncResult<EventPalette> {
        let mut response = ColorsResponse::default();
        for (id, background) in [("11", "#dc2127"), ("1", "#a4bdfc"), ("9", "#5484ed")] {
            response.event.insert(
                id.to_string(),
                ColorDefinition {
                    background: background.to_string(),
                    foreground: "#1d1d1d".to_string(),
                },
            );
        }
        Ok(response.into())
    }
}

fn eastern() -> FixedOffset {
    FixedOffset::west_opt(5 * 3600).unwrap()
}

fn fixture_games() -> Vec<ScheduledGame> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/schedule.csv");
    load_schedule(path, &SeasonCalendar::new(2022, eastern())).unwrap()
}

fn settings() -> SyncSettings {
    let teams_file = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/teams.toml");
    SyncSettings {
        event_timezone: chrono_tz::America::New_York,
        source_offset: eastern(),
        start_correction_hours: 0,
        event_duration_hours: 3,
        insert_delay: Duration::ZERO,
        skip_existing: true,
        teams: TeamColors::load(teams_file).unwrap(),
    }
}

#[tokio::test]
async fn test_create_events_from_schedule() {
    let sync = ScheduleSync::new(MockCalendar::new(250), settings());

    let report = sync.create_events(&fixture_games()).await.unwrap();

    assert_eq!(report.created, 5);
    assert_eq!(report.skipped, 0);
    assert!(report.failed.is_empty());

    let events = sync.service().events();
    assert_eq!(events.len(), 5);
    assert_eq!(
        events[0].summary.as_deref(),
        Some("Buffalo Bills @ Los Angeles Rams")
    );
    assert_eq!(events[0].color_id.as_deref(), Some("9"));
    // 8:20 PM EDT
    assert_eq!(
        events[0].start.date_time.as_deref(),
        Some("2022-09-09T00:20:00Z")
    );
    assert_eq!(events[0].end.date_time.as_deref(), Some("2022-09-09T03:20:00Z"));
    // 1:00 PM EDT
    assert_eq!(
        events[1].start.date_time.as_deref(),
        Some("2022-09-11T17:00:00Z")
    );
    // 1:00 PM EST
    assert_eq!(
        events[3].start.date_time.as_deref(),
        Some("2023-01-01T18:00:00Z")
    );

    // January games land in the following year
    assert_eq!(
        events[4].start.date_time.as_deref(),
        Some("2023-01-08T21:25:00Z")
    );
    assert_eq!(events[4].color_id.as_deref(), Some("2"));
}

#[tokio::test]
async fn test_insert_failure_does_not_halt_later_rows() {
    let calendar = MockCalendar::new(250).failing_insert("New Orleans Saints @ Atlanta Falcons");
    let sync = ScheduleSync::new(calendar, settings());

    let report = sync.create_events(&fixture_games()).await.unwrap();

    assert_eq!(report.created, 4);
    assert_eq!(report.failed, vec!["New Orleans Saints @ Atlanta Falcons".to_string()]);
    assert_eq!(
        sync.service().summaries(),
        vec![
            "Buffalo Bills @ Los Angeles Rams",
            "Denver Broncos @ Seattle Seahawks",
            "Miami Dolphins @ New England Patriots",
            "Buffalo Bills @ Miami Dolphins",
        ]
    );
}

#[tokio::test]
async fn test_rerun_skips_existing_events() {
    let sync = ScheduleSync::new(MockCalendar::new(2), settings());
    let games = fixture_games();

    sync.create_events(&games).await.unwrap();
    let report = sync.create_events(&games).await.unwrap();

    assert_eq!(report.created, 0);
    assert_eq!(report.skipped, 5);
    assert_eq!(sync.service().events().len(), 5);
}

#[tokio::test]
async fn test_rerun_without_skip_duplicates_events() {
    let mut settings = settings();
    settings.skip_existing = false;
    let sync = ScheduleSync::new(MockCalendar::new(250), settings);
    let games = fixture_games();

    sync.create_events(&games).await.unwrap();
    let report = sync.create_events(&games).await.unwrap();

    assert_eq!(report.created, 5);
    assert_eq!(sync.service().events().len(), 10);
    // No listing needed when duplicates are allowed
    assert_eq!(sync.service().list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_team_aborts_before_any_insert() {
    let mut settings = settings();
    settings.teams = TeamColors::from_toml(r#""Los Angeles Rams" = 9"#).unwrap();
    let sync = ScheduleSync::new(MockCalendar::new(250), settings);

    let result = sync.create_events(&fixture_games()).await;

    assert!(matches!(result, Err(Error::UnknownTeam(team)) if team == "Atlanta Falcons"));
    assert!(sync.service().events().is_empty());
}

#[tokio::test]
async fn test_inserts_are_spaced_by_delay() {
    let mut settings = settings();
    settings.skip_existing = false;
    settings.insert_delay = Duration::from_millis(25);
    let sync = ScheduleSync::new(MockCalendar::new(250), settings);
    let games = fixture_games();

    let started = Instant::now();
    sync.create_events(&games[..3]).await.unwrap();

    // Pauses sit between inserts, not after the last one
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(sync.service().events().len(), 3);
}

#[tokio::test]
async fn test_delete_all_follows_continuation_tokens() {
    let calendar = MockCalendar::new(2).failing_delete("evt3");
    let sync = ScheduleSync::new(calendar, settings());

    sync.create_events(&fixture_games()).await.unwrap();
    let calls_before = sync.service().list_calls.load(Ordering::SeqCst);

    let report = sync.delete_all_events().await.unwrap();

    assert_eq!(report.deleted, 4);
    assert_eq!(report.failed, vec!["evt3".to_string()]);
    // Five events in pages of two
    assert_eq!(sync.service().list_calls.load(Ordering::SeqCst) - calls_before, 3);

    let remaining = sync.service().events();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "evt3");
}

#[tokio::test]
async fn test_upcoming_events_are_limited_and_ordered() {
    let sync = ScheduleSync::new(MockCalendar::new(250), settings());
    sync.create_events(&fixture_games()).await.unwrap();

    let now = Utc.with_ymd_and_hms(2022, 9, 10, 0, 0, 0).unwrap();
    let events = sync.upcoming_events(now, 2).await.unwrap();

    let summaries: Vec<_> = events.iter().filter_map(|e| e.summary.as_deref()).collect();
    assert_eq!(
        summaries,
        vec![
            "New Orleans Saints @ Atlanta Falcons",
            "Denver Broncos @ Seattle Seahawks",
        ]
    );
}

#[tokio::test]
async fn test_color_options_sorted_by_id() {
    let sync = ScheduleSync::new(MockCalendar::new(250), settings());

    let palette = sync.color_options().await.unwrap();

    let ids: Vec<&str> = palette.0.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["1", "9", "11"]);
}
