use super::models::{
    ApiErrorBody, CalendarEvent, ColorsResponse, EventPalette, EventsPage, ListQuery, NewEvent,
};
use super::token::Authorizer;
use crate::error::{google_calendar_error, Error, SyncResult};
use crate::schedule::time::format_instant;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Google Calendar v3 REST root
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// The calendar operations the sync needs
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// One page of events
    async fn list_events(&self, query: &ListQuery) -> SyncResult<EventsPage>;

    /// Create an event and return it with its assigned id
    async fn insert_event(&self, event: &NewEvent) -> SyncResult<CalendarEvent>;

    /// Delete an event by id
    async fn delete_event(&self, event_id: &str) -> SyncResult<()>;

    /// The event color palette
    async fn event_colors(&self) -> SyncResult<EventPalette>;
}

/// reqwest client scoped to one calendar
pub struct GoogleCalendarClient {
    client: Client,
    authorizer: Arc<dyn Authorizer>,
    calendar_id: String,
    base_url: Url,
}

impl GoogleCalendarClient {
    pub fn new(calendar_id: impl Into<String>, authorizer: Arc<dyn Authorizer>) -> SyncResult<Self> {
        Self::with_base_url(calendar_id, authorizer, CALENDAR_API_BASE)
    }

    pub fn with_base_url(
        calendar_id: impl Into<String>,
        authorizer: Arc<dyn Authorizer>,
        base_url: &str,
    ) -> SyncResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))?;
        Ok(Self {
            client: Client::new(),
            authorizer,
            calendar_id: calendar_id.into(),
            base_url,
        })
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// Base URL with extra path segments, each percent-encoded
    fn endpoint(&self, segments: &[&str]) -> SyncResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| google_calendar_error("Base URL cannot have a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `calendars/{id}/events` with the listing parameters
    pub fn events_url(&self, query: &ListQuery) -> SyncResult<Url> {
        let mut url = self.endpoint(&["calendars", self.calendar_id.as_str(), "events"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(time_min) = query.time_min {
                pairs.append_pair("timeMin", &format_instant(time_min));
                pairs.append_pair("singleEvents", "true");
                pairs.append_pair("orderBy", "startTime");
            }
            if let Some(max_results) = query.max_results {
                pairs.append_pair("maxResults", &max_results.to_string());
            }
            if let Some(token) = &query.page_token {
                pairs.append_pair("pageToken", token);
            }
        }
        // Drop a dangling "?" when no parameters were added
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    /// `calendars/{id}/events/{eventId}`
    pub fn event_url(&self, event_id: &str) -> SyncResult<Url> {
        self.endpoint(&["calendars", self.calendar_id.as_str(), "events", event_id])
    }

    async fn bearer(&self) -> SyncResult<String> {
        self.authorizer.access_token().await
    }

    async fn send(&self, request: reqwest::RequestBuilder, action: &str) -> SyncResult<Response> {
        let token = self.bearer().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to {}: {}", action, e)))?;
        check_status(response).await
    }

    async fn json<T: DeserializeOwned>(response: Response, action: &str) -> SyncResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse {} response: {}", action, e)))
    }
}

/// Turn a non-2xx response into an API error with Google's message
async fn check_status(response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error response".to_string());
    Err(Error::Api {
        status: status.as_u16(),
        message: api_error_message(&body),
    })
}

/// Google's `error.message`, or the raw body when it has none
pub fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[async_trait]
impl CalendarService for GoogleCalendarClient {
    async fn list_events(&self, query: &ListQuery) -> SyncResult<EventsPage> {
        let url = self.events_url(query)?;
        debug!("Listing events: {}", url);
        let response = self.send(self.client.get(url), "fetch events").await?;
        Self::json(response, "events").await
    }

    async fn insert_event(&self, event: &NewEvent) -> SyncResult<CalendarEvent> {
        let url = self.endpoint(&["calendars", self.calendar_id.as_str(), "events"])?;
        let response = self
            .send(self.client.post(url).json(event), "insert event")
            .await?;
        Self::json(response, "insert").await
    }

    async fn delete_event(&self, event_id: &str) -> SyncResult<()> {
        let url = self.event_url(event_id)?;
        match self.send(self.client.delete(url), "delete event").await {
            Ok(_) => Ok(()),
            // Already deleted
            Err(e) if e.is_status(StatusCode::GONE.as_u16()) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn event_colors(&self) -> SyncResult<EventPalette> {
        let url = self.endpoint(&["colors"])?;
        let response = self.send(self.client.get(url), "fetch colors").await?;
        let colors: ColorsResponse = Self::json(response, "colors").await?;
        Ok(colors.into())
    }
}
