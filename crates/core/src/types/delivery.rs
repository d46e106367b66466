//! Delivery date rules for iron and wash orders.

use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Timelike};

/// Urgent orders placed before this hour are delivered the same evening.
pub const URGENT_CUTOFF_HOUR: u32 = 18;

/// Urgent orders go out on the evening run at this hour.
pub const EVENING_DELIVERY_HOUR: u32 = 20;

/// Standard turnaround for orders without urgent items.
pub const STANDARD_TURNAROUND_HOURS: i64 = 24;

/// Compute when an order placed at `placed_at` will be delivered.
///
/// - Any urgent item: 20:00 the same day when placed before 18:00, otherwise
///   20:00 the next day.
/// - No urgent items: exactly 24 hours after placement.
///
/// `placed_at` is wall-clock time at the shop.
#[must_use]
pub fn delivery_date(placed_at: NaiveDateTime, urgent_items: i32) -> NaiveDateTime {
    if urgent_items <= 0 {
        return placed_at + TimeDelta::hours(STANDARD_TURNAROUND_HOURS);
    }

    let day = if placed_at.hour() < URGENT_CUTOFF_HOUR {
        placed_at.date()
    } else {
        placed_at.date() + TimeDelta::days(1)
    };
    let evening = NaiveTime::from_hms_opt(EVENING_DELIVERY_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
    day.and_time(evening)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_urgent_before_cutoff_is_same_evening() {
        assert_eq!(delivery_date(at(10, 9, 15), 2), at(10, 20, 0));
        assert_eq!(delivery_date(at(10, 17, 59), 1), at(10, 20, 0));
    }

    #[test]
    fn test_urgent_after_cutoff_is_next_evening() {
        assert_eq!(delivery_date(at(10, 18, 0), 1), at(11, 20, 0));
        assert_eq!(delivery_date(at(10, 23, 30), 3), at(11, 20, 0));
    }

    #[test]
    fn test_urgent_crosses_month_boundary() {
        assert_eq!(delivery_date(at(31, 19, 0), 1), {
            NaiveDate::from_ymd_opt(2025, 4, 1)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap()
        });
    }

    #[test]
    fn test_normal_order_is_plus_24_hours() {
        assert_eq!(delivery_date(at(10, 18, 45), 0), at(11, 18, 45));
        assert_eq!(delivery_date(at(10, 7, 5), 0), at(11, 7, 5));
    }

    #[test]
    fn test_negative_urgent_count_is_treated_as_normal() {
        assert_eq!(delivery_date(at(10, 10, 0), -1), at(11, 10, 0));
    }
}
