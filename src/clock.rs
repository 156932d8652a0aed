use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};
use tracing::warn;

const DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const DATE_TIME: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Current date as stored in `createdAt`.
pub fn today() -> String {
    render(OffsetDateTime::now_utc(), DATE)
}

/// Current timestamp as stored in `lastLogin` and activity entries.
pub fn now_stamp() -> String {
    render(OffsetDateTime::now_utc(), DATE_TIME)
}

fn render(at: OffsetDateTime, format: &[FormatItem<'_>]) -> String {
    at.format(format).unwrap_or_else(|e| {
        warn!(error = %e, "timestamp formatting failed");
        at.date().to_string()
    })
}
