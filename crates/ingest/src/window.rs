use chrono::{DateTime, Days, NaiveDate, Utc};
use rapport_core::{ChatEvent, RapportError, RapportResult};
use tracing::info;

const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d"];

/// Inclusive date range restricting which events are analysed.
///
/// Dates are calendar days in UTC; the end day is kept whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    /// First instant kept.
    pub start: Option<DateTime<Utc>>,
    /// First instant dropped (midnight after the end day).
    pub end_exclusive: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Build a window from optional `YYYY/MM/DD` or `YYYY-MM-DD` dates.
    pub fn from_dates(start: Option<&str>, end: Option<&str>) -> RapportResult<Self> {
        let start_day = start.map(parse_date).transpose()?;
        let end_day = end.map(parse_date).transpose()?;

        if let (Some(s), Some(e)) = (start_day, end_day) {
            if s > e {
                return Err(RapportError::Other(format!(
                    "start date {} is after end date {}",
                    s, e
                )));
            }
        }

        let end_exclusive = match end_day {
            Some(day) => Some(
                day.checked_add_days(Days::new(1))
                    .ok_or_else(|| RapportError::InvalidTimestamp(day.to_string()))?
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| RapportError::InvalidTimestamp(day.to_string()))?
                    .and_utc(),
            ),
            None => None,
        };
        let start = match start_day {
            Some(day) => Some(
                day.and_hms_opt(0, 0, 0)
                    .ok_or_else(|| RapportError::InvalidTimestamp(day.to_string()))?
                    .and_utc(),
            ),
            None => None,
        };

        Ok(Self { start, end_exclusive })
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end_exclusive.is_none()
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| ts >= s) && self.end_exclusive.map_or(true, |e| ts < e)
    }

    /// Keep the events inside the window, preserving order.
    pub fn apply(&self, events: Vec<ChatEvent>) -> Vec<ChatEvent> {
        if self.is_unbounded() {
            return events;
        }
        let before = events.len();
        let kept: Vec<ChatEvent> = events
            .into_iter()
            .filter(|e| self.contains(e.timestamp))
            .collect();
        info!("Time window kept {} of {} events", kept.len(), before);
        kept
    }
}

fn parse_date(text: &str) -> RapportResult<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .ok_or_else(|| RapportError::InvalidTimestamp(format!("{} (expected YYYY/MM/DD)", text)))
}
