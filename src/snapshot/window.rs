use std::fmt;

use bambulabs::message::PushStatus;
use chrono::{DateTime, Duration, Local, NaiveDateTime};

/// Snapshots may be written a little after the estimated end of a print.
const GRACE_MINUTES: i64 = 10;
const MAX_HEURISTIC_AGE_HOURS: i64 = 24;

/// The time range a snapshot has to fall in to count as current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidityWindow {
    /// Tied to a known print job: from `start` until the expected duration
    /// plus a ten minute grace period has passed, both ends inclusive.
    Anchored {
        /// When the print started.
        start: NaiveDateTime,
        /// The expected print duration, in minutes.
        duration_minutes: u32,
    },
    /// No job information: anything recorded today and at most a day old.
    #[default]
    Heuristic,
}

impl ValidityWindow {
    /// A window anchored at a print's start time.
    pub fn anchored(start: NaiveDateTime, duration_minutes: u32) -> Self {
        Self::Anchored {
            start,
            duration_minutes,
        }
    }

    /// Anchored when both halves of the anchor are known, heuristic
    /// otherwise.
    pub fn from_anchor(start: Option<NaiveDateTime>, duration_minutes: Option<u32>) -> Self {
        match (start, duration_minutes) {
            (Some(start), Some(duration_minutes)) => Self::anchored(start, duration_minutes),
            _ => Self::Heuristic,
        }
    }

    /// Derive the window of the job described by a printer status report.
    ///
    /// The duration is what has elapsed so far plus what the printer says is
    /// left. Returns `None` when the report has no start time or no
    /// remaining-time estimate.
    pub fn from_status(status: &PushStatus, now: NaiveDateTime) -> Option<Self> {
        let start_secs = status
            .gcode_start_time
            .as_deref()?
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|secs| *secs > 0)?;
        let start = DateTime::from_timestamp(start_secs, 0)?
            .with_timezone(&Local)
            .naive_local();

        Some(Self::from_progress(start, status.mc_remaining_time?, now))
    }

    fn from_progress(start: NaiveDateTime, remaining_minutes: i64, now: NaiveDateTime) -> Self {
        let elapsed = (now - start).num_minutes().max(0);
        let total = elapsed.saturating_add(remaining_minutes.max(0));
        Self::anchored(start, u32::try_from(total).unwrap_or(u32::MAX))
    }

    /// The last acceptable moment of an anchored window.
    pub fn end(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Anchored {
                start,
                duration_minutes,
            } => Some(*start + Duration::minutes(i64::from(*duration_minutes) + GRACE_MINUTES)),
            Self::Heuristic => None,
        }
    }

    /// Whether a snapshot taken at `timestamp` is current as of `now`. A
    /// snapshot without a timestamp never is.
    pub fn is_valid(&self, timestamp: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
        let Some(timestamp) = timestamp else {
            return false;
        };

        match self {
            Self::Anchored { start, .. } => {
                if timestamp < *start {
                    return false;
                }
                match self.end() {
                    Some(end) => timestamp <= end,
                    None => false,
                }
            }
            Self::Heuristic => {
                if timestamp.date() != now.date() {
                    return false;
                }
                now - timestamp <= Duration::hours(MAX_HEURISTIC_AGE_HOURS)
            }
        }
    }
}

impl fmt::Display for ValidityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.end()) {
            (Self::Anchored { start, duration_minutes }, Some(end)) => write!(
                f,
                "print started {} ({} min), accepting snapshots until {}",
                start.format("%Y-%m-%d %H:%M:%S"),
                duration_minutes,
                end.format("%Y-%m-%d %H:%M:%S")
            ),
            _ => f.write_str("only snapshots from today"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;

    fn at(d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    fn status(json: &str) -> PushStatus {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_missing_timestamp_is_never_valid() {
        let now = at(1, 12, 0, 0);
        assert!(!ValidityWindow::Heuristic.is_valid(None, now));
        assert!(!ValidityWindow::anchored(at(1, 10, 0, 0), 20).is_valid(None, now));
    }

    #[test]
    fn test_anchored_bounds_are_inclusive() {
        let window = ValidityWindow::anchored(at(1, 10, 0, 0), 20);
        let now = at(2, 0, 0, 0);

        assert!(!window.is_valid(Some(at(1, 9, 59, 59)), now));
        assert!(window.is_valid(Some(at(1, 10, 0, 0)), now));
        assert!(window.is_valid(Some(at(1, 10, 20, 0)), now));
        assert!(window.is_valid(Some(at(1, 10, 30, 0)), now));
        assert!(!window.is_valid(Some(at(1, 10, 30, 1)), now));
        assert!(!window.is_valid(Some(at(1, 10, 35, 0)), now));
    }

    #[test]
    fn test_anchored_matches_closed_interval() {
        let start = at(1, 10, 0, 0);
        let now = at(1, 23, 0, 0);
        for duration in [0u32, 1, 20, 90] {
            let window = ValidityWindow::anchored(start, duration);
            let end = start + Duration::minutes(i64::from(duration) + 10);
            for offset in -5i64..=(i64::from(duration) + 15) {
                let t = start + Duration::minutes(offset);
                assert_eq!(window.is_valid(Some(t), now), start <= t && t <= end, "{duration} {offset}");
            }
        }
    }

    #[test]
    fn test_anchored_ignores_now() {
        let window = ValidityWindow::anchored(at(1, 10, 0, 0), 20);
        assert!(window.is_valid(Some(at(1, 10, 5, 0)), at(30, 0, 0, 0)));
    }

    #[test]
    fn test_heuristic_same_day_and_age() {
        let now = at(1, 14, 10, 0);

        assert!(ValidityWindow::Heuristic.is_valid(Some(at(1, 0, 0, 0)), now));
        assert!(ValidityWindow::Heuristic.is_valid(Some(at(1, 14, 10, 0)), now));
        assert!(!ValidityWindow::Heuristic.is_valid(Some(at(1, 14, 10, 0) - Duration::days(1)), now));
    }

    #[test]
    fn test_heuristic_keeps_literal_calendar_day() {
        // Two minutes old, but recorded yesterday.
        let now = at(2, 0, 1, 0);
        assert!(!ValidityWindow::Heuristic.is_valid(Some(at(1, 23, 59, 0)), now));
    }

    #[test]
    fn test_heuristic_accepts_later_today() {
        let now = at(1, 8, 0, 0);
        assert!(ValidityWindow::Heuristic.is_valid(Some(at(1, 9, 0, 0)), now));
    }

    #[test]
    fn test_from_anchor_requires_both_halves() {
        assert_eq!(ValidityWindow::from_anchor(Some(at(1, 10, 0, 0)), None), ValidityWindow::Heuristic);
        assert_eq!(ValidityWindow::from_anchor(None, Some(20)), ValidityWindow::Heuristic);
        assert_eq!(
            ValidityWindow::from_anchor(Some(at(1, 10, 0, 0)), Some(20)),
            ValidityWindow::anchored(at(1, 10, 0, 0), 20)
        );
    }

    #[test]
    fn test_from_progress() {
        let window = ValidityWindow::from_progress(at(1, 10, 0, 0), 45, at(1, 10, 30, 0));
        assert_eq!(window, ValidityWindow::anchored(at(1, 10, 0, 0), 75));
        assert_eq!(window.end(), Some(at(1, 11, 25, 0)));
    }

    #[test]
    fn test_from_status() {
        let now = at(1, 12, 0, 0);
        let with_start = status(
            r#"{"sequence_id": "1", "gcode_start_time": "1717236000", "mc_remaining_time": 30}"#,
        );
        let window = ValidityWindow::from_status(&with_start, now).unwrap();
        let expected_start = DateTime::from_timestamp(1_717_236_000, 0)
            .unwrap()
            .with_timezone(&Local)
            .naive_local();
        assert!(matches!(window, ValidityWindow::Anchored { start, .. } if start == expected_start));

        let idle = status(r#"{"sequence_id": "1", "gcode_start_time": "0", "mc_remaining_time": 0}"#);
        assert_eq!(ValidityWindow::from_status(&idle, now), None);

        let no_estimate = status(r#"{"sequence_id": "1", "gcode_start_time": "1717236000"}"#);
        assert_eq!(ValidityWindow::from_status(&no_estimate, now), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(ValidityWindow::Heuristic.to_string(), "only snapshots from today");
        assert_eq!(
            ValidityWindow::anchored(at(1, 10, 0, 0), 20).to_string(),
            "print started 2024-06-01 10:00:00 (20 min), accepting snapshots until 2024-06-01 10:30:00"
        );
    }
}
