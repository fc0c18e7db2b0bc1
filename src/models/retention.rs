//! Retention policy

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Largest retention period, in either direction, a configuration may carry
pub const MAX_RETENTION_DAYS: i64 = 365_000;

/// Number of days a snapshot is kept before it becomes eligible for removal
///
/// Zero and negative values are representable; they make every snapshot
/// with metadata eligible, which the enforcer still never lets reach the
/// newest restorable snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub days: i64,
}

impl RetentionPolicy {
    pub fn new(days: i64) -> Self {
        Self { days }
    }

    /// Whether the period lies within [`MAX_RETENTION_DAYS`]
    pub fn is_within_bounds(&self) -> bool {
        (-MAX_RETENTION_DAYS..=MAX_RETENTION_DAYS).contains(&self.days)
    }

    /// Expiry date of a snapshot created on `created`
    ///
    /// Saturates at the calendar's limits instead of overflowing.
    pub fn expiry_date(&self, created: NaiveDate) -> NaiveDate {
        Duration::try_days(self.days)
            .and_then(|period| created.checked_add_signed(period))
            .unwrap_or(if self.days < 0 {
                NaiveDate::MIN
            } else {
                NaiveDate::MAX
            })
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(crate::config::settings::DEFAULT_RETENTION_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_expiry_date() {
        assert_eq!(RetentionPolicy::new(7).expiry_date(day(2024, 2, 25)), day(2024, 3, 3));
        assert_eq!(RetentionPolicy::new(0).expiry_date(day(2024, 2, 25)), day(2024, 2, 25));
        assert_eq!(RetentionPolicy::new(-5).expiry_date(day(2024, 2, 25)), day(2024, 2, 20));
    }

    #[test]
    fn test_expiry_date_saturates() {
        let created = day(2024, 3, 14);
        assert_eq!(
            RetentionPolicy::new(200_000_000_000_000).expiry_date(created),
            NaiveDate::MAX
        );
        assert_eq!(RetentionPolicy::new(i64::MAX).expiry_date(created), NaiveDate::MAX);
        assert_eq!(RetentionPolicy::new(i64::MIN).expiry_date(created), NaiveDate::MIN);
        // Representable as a duration, but past the last date
        assert_eq!(RetentionPolicy::new(100_000_000).expiry_date(created), NaiveDate::MAX);
    }

    #[test]
    fn test_bounds() {
        assert!(RetentionPolicy::new(MAX_RETENTION_DAYS).is_within_bounds());
        assert!(RetentionPolicy::new(-3).is_within_bounds());
        assert!(!RetentionPolicy::new(MAX_RETENTION_DAYS + 1).is_within_bounds());
        assert!(!RetentionPolicy::new(i64::MIN).is_within_bounds());
    }
}
