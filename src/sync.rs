use crate::config::Config;
use crate::error::{config_error, SyncResult};
use crate::google_calendar::{
    CalendarEvent, CalendarService, EventPalette, ListQuery, NewEvent,
};
use crate::schedule::time::{add_hours, format_instant, resolve_in_zone};
use crate::schedule::{ScheduledGame, TeamColors};
use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// How schedule rows become calendar events
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub event_timezone: Tz,
    /// Offset the schedule rows were normalized at
    pub source_offset: FixedOffset,
    pub start_correction_hours: i64,
    pub event_duration_hours: i64,
    pub insert_delay: Duration,
    pub skip_existing: bool,
    pub teams: TeamColors,
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> SyncResult<Self> {
        let event_timezone = Tz::from_str(&config.event_timezone).map_err(|_| {
            config_error(&format!("Unknown EVENT_TIMEZONE '{}'", config.event_timezone))
        })?;

        Ok(Self {
            event_timezone,
            source_offset: config.season()?.source_offset,
            start_correction_hours: config.start_correction_hours,
            event_duration_hours: config.event_duration_hours,
            insert_delay: Duration::from_millis(config.insert_delay_ms),
            skip_existing: config.skip_existing,
            teams: config.teams.clone(),
        })
    }
}

/// Identity of an event for duplicate detection: title plus start instant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub summary: String,
    pub start: DateTime<Utc>,
}

impl EventKey {
    pub fn from_event(event: &CalendarEvent) -> Option<Self> {
        Some(Self {
            summary: event.summary.clone()?,
            start: event.start.instant()?,
        })
    }

    pub fn from_new(event: &NewEvent) -> Option<Self> {
        Some(Self {
            summary: event.summary.clone(),
            start: event.start.instant()?,
        })
    }
}

/// Outcome of creating events for a schedule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateReport {
    pub created: usize,
    pub skipped: usize,
    /// Summaries of events the service rejected
    pub failed: Vec<String>,
}

/// Outcome of clearing a calendar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: usize,
    /// Ids of events that could not be deleted
    pub failed: Vec<String>,
}

/// Sequential schedule-to-calendar synchronization
pub struct ScheduleSync<S: CalendarService> {
    service: S,
    settings: SyncSettings,
}

impl<S: CalendarService> ScheduleSync<S> {
    pub fn new(service: S, settings: SyncSettings) -> Self {
        Self { service, settings }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Event body for one game, with kickoff as wall time in the event timezone
    pub fn build_event(&self, game: &ScheduledGame) -> SyncResult<NewEvent> {
        let color = self.settings.teams.color_for(&game.row.home_team)?;
        let kickoff = resolve_in_zone(
            game.start,
            self.settings.source_offset,
            self.settings.event_timezone,
        )?;
        let start = add_hours(kickoff, self.settings.start_correction_hours)?;
        let end = add_hours(start, self.settings.event_duration_hours)?;

        Ok(NewEvent::new(
            game.row.summary(),
            start,
            end,
            self.settings.event_timezone.name(),
            color,
        ))
    }

    /// Event bodies for the whole schedule; any unknown team fails the lot
    pub fn build_events(&self, games: &[ScheduledGame]) -> SyncResult<Vec<NewEvent>> {
        games.iter().map(|game| self.build_event(game)).collect()
    }

    /// Every event on the calendar, following continuation tokens
    pub async fn all_events(&self, time_min: Option<DateTime<Utc>>) -> SyncResult<Vec<CalendarEvent>> {
        let mut events = Vec::new();
        let mut page_token = None;

        loop {
            let query = ListQuery {
                time_min,
                page_token,
                max_results: None,
            };
            let page = self.service.list_events(&query).await?;
            events.extend(page.items);

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(events)
    }

    /// Create one event per game, pausing between inserts.
    ///
    /// Insert failures are logged and counted; the remaining games are still
    /// attempted.
    pub async fn create_events(&self, games: &[ScheduledGame]) -> SyncResult<CreateReport> {
        let events = self.build_events(games)?;

        let existing: HashSet<EventKey> = if self.settings.skip_existing {
            let keys: HashSet<_> = self
                .all_events(None)
                .await?
                .iter()
                .filter_map(EventKey::from_event)
                .collect();
            debug!("Calendar already holds {} events", keys.len());
            keys
        } else {
            HashSet::new()
        };

        let mut report = CreateReport::default();
        let mut first_insert = true;

        for event in &events {
            if EventKey::from_new(event).is_some_and(|key| existing.contains(&key)) {
                debug!("Skipping existing event: {}", event.summary);
                report.skipped += 1;
                continue;
            }

            if !first_insert && !self.settings.insert_delay.is_zero() {
                sleep(self.settings.insert_delay).await;
            }
            first_insert = false;

            match self.service.insert_event(event).await {
                Ok(created) => {
                    info!(
                        "Event created: {} {}",
                        created.summary.as_deref().unwrap_or(&event.summary),
                        created.start.display()
                    );
                    report.created += 1;
                }
                Err(e) => {
                    error!("An error occurred trying to add '{}': {}", event.summary, e);
                    report.failed.push(event.summary.clone());
                }
            }
        }

        info!(
            "Created {} events, skipped {} existing, {} failed",
            report.created,
            report.skipped,
            report.failed.len()
        );
        Ok(report)
    }

    /// The next `max` events starting from `now`
    pub async fn upcoming_events(&self, now: DateTime<Utc>, max: u32) -> SyncResult<Vec<CalendarEvent>> {
        info!("Getting the upcoming {} events from {}", max, format_instant(now));
        let page = self
            .service
            .list_events(&ListQuery::upcoming(now).with_max_results(max))
            .await?;
        Ok(page.items)
    }

    /// Delete every event on the calendar, page by page
    pub async fn delete_all_events(&self) -> SyncResult<DeleteReport> {
        let mut report = DeleteReport::default();
        let mut page_token = None;

        loop {
            let page = self
                .service
                .list_events(&ListQuery::default().with_page_token(page_token))
                .await?;

            for event in &page.items {
                match self.service.delete_event(&event.id).await {
                    Ok(()) => {
                        debug!("Deleted event {}", event.id);
                        report.deleted += 1;
                    }
                    Err(e) => {
                        error!("Failed to delete event {}: {}", event.id, e);
                        report.failed.push(event.id.clone());
                    }
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        info!(
            "Deleted {} events, {} failed",
            report.deleted,
            report.failed.len()
        );
        Ok(report)
    }

    /// The calendar's event color palette
    pub async fn color_options(&self) -> SyncResult<EventPalette> {
        self.service.event_colors().await
    }
}
