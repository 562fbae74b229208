use chrono::{DateTime, Local, TimeZone};
use std::fmt::Write;

const FALLBACK_CLOCK_FORMAT: &str = "%H:%M";
const FALLBACK_DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats the clock and date labels. Formats use chrono's strftime syntax;
/// an invalid user format falls back to the default instead of panicking.
#[derive(Debug, Clone)]
pub struct ClockFormatter {
    clock_format: String,
    date_format: String,
}

impl ClockFormatter {
    pub fn new(clock_format: &str, date_format: &str) -> Self {
        Self {
            clock_format: clock_format.to_string(),
            date_format: date_format.to_string(),
        }
    }

    pub fn now(&self) -> (String, String) {
        self.format(&Local::now())
    }

    /// Returns `(clock, date)`.
    pub fn format<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> (String, String)
    where
        Tz::Offset: std::fmt::Display,
    {
        (
            format_or(at, &self.clock_format, FALLBACK_CLOCK_FORMAT),
            format_or(at, &self.date_format, FALLBACK_DATE_FORMAT),
        )
    }
}

fn format_or<Tz: TimeZone>(at: &DateTime<Tz>, fmt: &str, fallback: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    if write!(out, "{}", at.format(fmt)).is_ok() {
        return out;
    }
    out.clear();
    let _ = write!(out, "{}", at.format(fallback));
    out
}
