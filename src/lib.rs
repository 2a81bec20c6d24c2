pub mod cli;
pub mod config;
pub mod error;
pub mod google_calendar;
pub mod schedule;
pub mod startup;
pub mod sync;
