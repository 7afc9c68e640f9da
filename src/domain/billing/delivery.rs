//! Next delivery date calculation.

use super::{BillingInterval, Recurrence};
use crate::domain::foundation::Timestamp;

/// Days added when a price carries no usable interval metadata.
pub const FALLBACK_DELIVERY_DAYS: i64 = 7;

/// Computed delivery date plus whether the fallback was used.
///
/// Callers log `used_fallback` so missing interval metadata stays visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextDelivery {
    pub date: Timestamp,
    pub used_fallback: bool,
}

/// Next delivery date from the start of the current billing period.
///
/// day → +n days, week → +7n days, month → +n calendar months,
/// year → +n calendar years. Missing recurrence or arithmetic overflow
/// falls back to +7 days.
///
/// Returns `None` only when the fallback itself is out of range.
pub fn next_delivery_date(
    period_start: Timestamp,
    recurrence: Option<Recurrence>,
) -> Option<NextDelivery> {
    let computed = recurrence.and_then(|r| {
        let n = i64::from(r.interval_count);
        match r.interval {
            BillingInterval::Day => period_start.add_days(n),
            BillingInterval::Week => n.checked_mul(7).and_then(|days| period_start.add_days(days)),
            BillingInterval::Month => period_start.add_months(r.interval_count),
            BillingInterval::Year => r
                .interval_count
                .checked_mul(12)
                .and_then(|m| period_start.add_months(m)),
        }
    });

    match computed {
        Some(date) => Some(NextDelivery {
            date,
            used_fallback: false,
        }),
        None => period_start
            .add_days(FALLBACK_DELIVERY_DAYS)
            .map(|date| NextDelivery {
                date,
                used_fallback: true,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ymd(y: i32, m: u32, d: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap())
    }

    fn every(interval: BillingInterval, n: u32) -> Option<Recurrence> {
        Some(Recurrence::new(interval, n))
    }

    #[test]
    fn two_weeks_from_new_year_is_the_fifteenth() {
        let next = next_delivery_date(ymd(2025, 1, 1), every(BillingInterval::Week, 2)).unwrap();
        assert_eq!(next.date, ymd(2025, 1, 15));
        assert!(!next.used_fallback);
    }

    #[test]
    fn days_add_exactly() {
        let next = next_delivery_date(ymd(2025, 1, 1), every(BillingInterval::Day, 3)).unwrap();
        assert_eq!(next.date, ymd(2025, 1, 4));
    }

    #[test]
    fn months_are_calendar_months() {
        let next = next_delivery_date(ymd(2025, 1, 31), every(BillingInterval::Month, 1)).unwrap();
        assert_eq!(next.date, ymd(2025, 2, 28));

        let next = next_delivery_date(ymd(2025, 1, 15), every(BillingInterval::Month, 3)).unwrap();
        assert_eq!(next.date, ymd(2025, 4, 15));
    }

    #[test]
    fn years_are_calendar_years() {
        let next = next_delivery_date(ymd(2024, 2, 29), every(BillingInterval::Year, 1)).unwrap();
        assert_eq!(next.date, ymd(2025, 2, 28));
    }

    #[test]
    fn missing_recurrence_falls_back_to_a_week() {
        let next = next_delivery_date(ymd(2025, 1, 1), None).unwrap();
        assert_eq!(next.date, ymd(2025, 1, 8));
        assert!(next.used_fallback);
    }

    #[test]
    fn overflowing_year_count_falls_back() {
        let next = next_delivery_date(ymd(2025, 1, 1), every(BillingInterval::Year, u32::MAX)).unwrap();
        assert!(next.used_fallback);
    }

    #[test]
    fn huge_week_count_falls_back() {
        let next = next_delivery_date(ymd(2025, 1, 1), every(BillingInterval::Week, 100_000_000))
            .unwrap();
        assert!(next.used_fallback);
        assert_eq!(next.date, ymd(2025, 1, 8));
    }

    #[test]
    fn huge_day_count_falls_back() {
        let next = next_delivery_date(ymd(2025, 1, 1), every(BillingInterval::Day, u32::MAX)).unwrap();
        assert!(next.used_fallback);
    }

    #[test]
    fn start_near_the_end_of_time_has_no_delivery() {
        let start = Timestamp::from_unix_secs(8_210_266_800_000).unwrap();
        assert_eq!(next_delivery_date(start, None), None);
        assert_eq!(next_delivery_date(start, every(BillingInterval::Week, 1)), None);
    }
}
