use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::RateLimitSnapshot;

/// Seconds added on top of the reported reset time before resuming.
pub const RESET_BUFFER_SECS: i64 = 5;

#[derive(Debug, Clone, Default)]
pub struct RateLimitTracker {
    snapshot: Option<RateLimitSnapshot>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<&RateLimitSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn update(&mut self, snapshot: RateLimitSnapshot) {
        self.snapshot = Some(snapshot);
    }

    pub fn remaining(&self) -> Option<i64> {
        self.snapshot.as_ref().map(|s| s.remaining)
    }

    /// How long to pause before the next request.
    ///
    /// `None` means no pause: no snapshot, quota at or above `threshold`, or
    /// no usable reset time. A reset already in the past yields
    /// `Some(Duration::ZERO)` rather than a negative wait.
    pub fn wait_duration(&self, threshold: i64, now: DateTime<Utc>) -> Option<Duration> {
        let snapshot = self.snapshot.as_ref()?;
        if snapshot.remaining >= threshold {
            return None;
        }
        let reset = parse_reset(&snapshot.reset_at)?;
        let millis = (reset - now).num_milliseconds() + RESET_BUFFER_SECS * 1000;
        Some(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }

    pub fn describe(&self) -> String {
        let Some(snapshot) = self.snapshot.as_ref() else {
            return "?/? (resets at ?)".to_string();
        };
        let limit = snapshot
            .limit
            .map(|limit| limit.to_string())
            .unwrap_or_else(|| "?".to_string());
        let reset = if snapshot.reset_at.is_empty() {
            "?".to_string()
        } else {
            match parse_reset(&snapshot.reset_at) {
                Some(reset) => reset.format("%H:%M:%S").to_string(),
                None => snapshot.reset_at.clone(),
            }
        };
        format!("{}/{} (resets at {})", snapshot.remaining, limit, reset)
    }
}

pub fn parse_reset(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|reset| reset.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tracker(remaining: i64, reset_at: &str) -> RateLimitTracker {
        let mut tracker = RateLimitTracker::new();
        tracker.update(RateLimitSnapshot {
            remaining,
            limit: Some(5000),
            reset_at: reset_at.to_string(),
            cost: Some(1),
        });
        tracker
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn no_wait_at_or_above_threshold() {
        let t = tracker(100, "2024-05-01T12:30:00Z");
        assert_eq!(t.wait_duration(100, now()), None);
        assert_eq!(RateLimitTracker::new().wait_duration(100, now()), None);
    }

    #[test]
    fn low_quota_waits_until_reset_plus_buffer() {
        let t = tracker(42, "2024-05-01T12:01:00Z");
        assert_eq!(t.wait_duration(100, now()), Some(Duration::from_secs(65)));
    }

    #[test]
    fn past_reset_never_goes_negative() {
        let t = tracker(0, "2024-05-01T11:00:00Z");
        assert_eq!(t.wait_duration(100, now()), Some(Duration::ZERO));

        let t = tracker(0, "2024-05-01T11:59:57Z");
        assert_eq!(t.wait_duration(100, now()), Some(Duration::from_secs(2)));
    }

    #[test]
    fn unusable_reset_means_no_wait() {
        assert_eq!(tracker(1, "").wait_duration(100, now()), None);
        assert_eq!(tracker(1, "soon").wait_duration(100, now()), None);
    }

    #[test]
    fn describe_formats_reset_clock() {
        assert_eq!(
            tracker(4321, "2024-05-01T13:04:05Z").describe(),
            "4321/5000 (resets at 13:04:05)"
        );
        assert_eq!(tracker(7, "later").describe(), "7/5000 (resets at later)");
        assert_eq!(tracker(7, "").describe(), "7/5000 (resets at ?)");
        assert_eq!(RateLimitTracker::new().describe(), "?/? (resets at ?)");
    }
}
