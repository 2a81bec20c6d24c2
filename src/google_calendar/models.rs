use crate::schedule::time::{format_instant, parse_instant};
use crate::schedule::ColorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Start or end of an event, either timed (`dateTime`) or all-day (`date`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    pub fn timed(instant: DateTime<Utc>, time_zone: &str) -> Self {
        Self {
            date_time: Some(format_instant(instant)),
            date: None,
            time_zone: Some(time_zone.to_string()),
        }
    }

    /// Timed value as a UTC instant; `None` for all-day or unparsable values
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.date_time.as_deref().and_then(|dt| parse_instant(dt).ok())
    }

    /// Raw text for display, preferring `dateTime` over `date`
    pub fn display(&self) -> &str {
        self.date_time
            .as_deref()
            .or(self.date.as_deref())
            .unwrap_or("unknown time")
    }
}

/// Calendar event as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub color_id: Option<String>,
    #[serde(default)]
    pub start: EventDateTime,
    #[serde(default)]
    pub end: EventDateTime,
}

/// Event body sent on insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub summary: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub color_id: String,
}

impl NewEvent {
    pub fn new(
        summary: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        time_zone: &str,
        color: ColorId,
    ) -> Self {
        Self {
            summary: summary.into(),
            start: EventDateTime::timed(start, time_zone),
            end: EventDateTime::timed(end, time_zone),
            color_id: color.to_string(),
        }
    }
}

/// One page of an events listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventsPage {
    #[serde(default)]
    pub items: Vec<CalendarEvent>,
    pub next_page_token: Option<String>,
}

/// Parameters of an events listing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListQuery {
    /// Only events ending after this instant
    pub time_min: Option<DateTime<Utc>>,
    /// Continuation token from the previous page
    pub page_token: Option<String>,
    /// Page size
    pub max_results: Option<u32>,
}

impl ListQuery {
    /// Upcoming events from `time_min`, ordered by start time
    pub fn upcoming(time_min: DateTime<Utc>) -> Self {
        Self {
            time_min: Some(time_min),
            ..Default::default()
        }
    }

    pub fn with_page_token(mut self, token: Option<String>) -> Self {
        self.page_token = token;
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// Background and foreground of one palette entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorDefinition {
    pub background: String,
    pub foreground: String,
}

/// Response of the `colors` resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ColorsResponse {
    #[serde(default)]
    pub event: BTreeMap<String, ColorDefinition>,
}

/// Event color palette keyed by color id
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventPalette(pub Vec<(String, ColorDefinition)>);

impl From<ColorsResponse> for EventPalette {
    fn from(response: ColorsResponse) -> Self {
        let mut entries: Vec<_> = response.event.into_iter().collect();
        // Ids are numeric strings; "10" must sort after "9"
        entries.sort_by_key(|(id, _)| id.parse::<u32>().unwrap_or(u32::MAX));
        EventPalette(entries)
    }
}

/// Error body returned by Google APIs
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub message: String,
}
