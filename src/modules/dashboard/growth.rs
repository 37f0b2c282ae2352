//! Month arithmetic and percentage change for dashboard figures.

use chrono::{Datelike, Months, NaiveDate};

use crate::modules::dashboard::model::{Growth, TrendPoint};

/// Percent change from `previous` to `current`, rounded to one decimal.
/// Zero when both are zero and 100 when growing from nothing.
pub fn change_pct(current: i64, previous: i64) -> f64 {
    match (current, previous) {
        (0, 0) => 0.0,
        (c, 0) if c > 0 => 100.0,
        (_, 0) => -100.0,
        (c, p) => {
            let pct = (c - p) as f64 / p as f64 * 100.0;
            (pct * 10.0).round() / 10.0
        }
    }
}

pub fn growth(current: i64, previous: i64) -> Growth {
    Growth {
        current,
        previous,
        change_pct: change_pct(current, previous),
    }
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// `(previous, current, next)` month starts around `today`.
pub fn month_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate, NaiveDate) {
    let current = month_start(today);
    let previous = current - Months::new(1);
    let next = current + Months::new(1);
    (previous, current, next)
}

/// The last `months` month starts ending with the month of `today`, oldest first.
pub fn trailing_months(today: NaiveDate, months: u32) -> Vec<NaiveDate> {
    let current = month_start(today);
    (0..months)
        .rev()
        .map(|back| current - Months::new(back))
        .collect()
}

/// One point per month; months missing from `enrollments`/`revenue` are zero.
pub fn fill_months(
    months: &[NaiveDate],
    enrollments: &[(NaiveDate, i64)],
    revenue: &[(NaiveDate, i64)],
) -> Vec<TrendPoint> {
    let lookup = |rows: &[(NaiveDate, i64)], month: NaiveDate| {
        rows.iter()
            .find(|(m, _)| month_start(*m) == month)
            .map_or(0, |(_, v)| *v)
    };

    months
        .iter()
        .map(|&month| TrendPoint {
            month,
            enrollments: lookup(enrollments, month),
            revenue_cents: lookup(revenue, month),
        })
        .collect()
}
