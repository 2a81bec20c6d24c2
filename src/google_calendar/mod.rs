//! Google Calendar v3 access: wire models, the REST client, and OAuth.

pub mod client;
pub mod consent;
pub mod models;
pub mod token;

pub use client::{CalendarService, GoogleCalendarClient};
pub use models::{CalendarEvent, EventPalette, EventsPage, ListQuery, NewEvent};
pub use token::{Authorizer, TokenManager};
