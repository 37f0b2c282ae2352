//! Slot generation from weekly availability rules.
//!
//! All arithmetic is in UTC. A rule is a `[start, end)` window on one
//! weekday; a slot is emitted every `slot_minutes` from the window start
//! while the slot still ends inside the window.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

use abroadly_models::consultants::{AvailabilityRule, AvailabilityRuleInput, Slot, parse_hhmm};

/// Longest range accepted by the slots endpoint, in days.
pub const MAX_RANGE_DAYS: i64 = 31;

/// A rule reduced to minutes after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub weekday: u32,
    pub start: u32,
    pub end: u32,
}

impl Window {
    fn from_parts(weekday: i16, start: &str, end: &str) -> Option<Self> {
        let start = parse_hhmm(start)?;
        let end = parse_hhmm(end)?;
        let weekday = u32::try_from(weekday).ok().filter(|d| *d <= 6)?;
        Some(Self {
            weekday,
            start,
            end,
        })
    }

    pub fn from_rule(rule: &AvailabilityRule) -> Option<Self> {
        Self::from_parts(rule.weekday, &rule.start_time, &rule.end_time)
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.weekday == other.weekday && self.start < other.end && other.start < self.end
    }
}

/// Checks a replacement rule set: every window must be non-empty and no two
/// windows on the same weekday may overlap.
pub fn validate_rules(rules: &[AvailabilityRuleInput]) -> Result<Vec<Window>, String> {
    let mut windows = Vec::with_capacity(rules.len());
    for rule in rules {
        let window = Window::from_parts(rule.weekday, &rule.start_time, &rule.end_time)
            .ok_or_else(|| "Invalid availability rule".to_string())?;
        if window.start >= window.end {
            return Err(format!(
                "start_time {} must be before end_time {}",
                rule.start_time, rule.end_time
            ));
        }
        if windows.iter().any(|w: &Window| w.overlaps(&window)) {
            return Err(format!(
                "Overlapping availability rules on weekday {}",
                rule.weekday
            ));
        }
        windows.push(window);
    }
    Ok(windows)
}

/// Rejects reversed ranges and ranges longer than [`MAX_RANGE_DAYS`].
pub fn validate_range(from: NaiveDate, to: NaiveDate) -> Result<(), String> {
    if from > to {
        return Err("'from' must not be after 'to'".to_string());
    }
    if (to - from).num_days() + 1 > MAX_RANGE_DAYS {
        return Err(format!("Date range may not exceed {MAX_RANGE_DAYS} days"));
    }
    Ok(())
}

fn at_minutes(date: NaiveDate, minutes: u32) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_num_seconds_from_midnight_opt(minutes * 60, 0)?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

fn overlaps_busy(slot: &Slot, busy: &[(DateTime<Utc>, DateTime<Utc>)]) -> bool {
    busy.iter()
        .any(|(start, end)| slot.starts_at < *end && *start < slot.ends_at)
}

/// Generates the bookable slots for `from..=to`, skipping slots that start
/// before `now` or overlap a busy interval.
pub fn generate_slots(
    windows: &[Window],
    slot_minutes: i32,
    from: NaiveDate,
    to: NaiveDate,
    now: DateTime<Utc>,
    busy: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Vec<Slot> {
    let Ok(step) = u32::try_from(slot_minutes) else {
        return Vec::new();
    };
    if step == 0 {
        return Vec::new();
    }

    let mut sorted = windows.to_vec();
    sorted.sort_by_key(|w| (w.weekday, w.start));

    let mut slots = Vec::new();
    for date in from.iter_days().take_while(|d| *d <= to) {
        let weekday = date.weekday().num_days_from_sunday();
        for window in sorted.iter().filter(|w| w.weekday == weekday) {
            let mut start = window.start;
            while start + step <= window.end {
                if let (Some(starts_at), Some(ends_at)) =
                    (at_minutes(date, start), at_minutes(date, start + step))
                {
                    let slot = Slot { starts_at, ends_at };
                    if slot.starts_at >= now && !overlaps_busy(&slot, busy) {
                        slots.push(slot);
                    }
                }
                start += step;
            }
        }
    }
    slots
}

/// The slot starting at `starts_at`, if it lines up with a window.
pub fn slot_at(windows: &[Window], slot_minutes: i32, starts_at: DateTime<Utc>) -> Option<Slot> {
    let step = u32::try_from(slot_minutes).ok().filter(|s| *s > 0)?;
    if starts_at.second() != 0 || starts_at.nanosecond() != 0 {
        return None;
    }
    let date = starts_at.date_naive();
    let weekday = date.weekday().num_days_from_sunday();
    let minute = starts_at.time().num_seconds_from_midnight() / 60;

    windows
        .iter()
        .filter(|w| w.weekday == weekday)
        .find(|w| minute >= w.start && (minute - w.start) % step == 0 && minute + step <= w.end)
        .map(|_| Slot {
            starts_at,
            ends_at: starts_at + Duration::minutes(i64::from(step)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(weekday: u32, start: &str, end: &str) -> Window {
        Window {
            weekday,
            start: parse_hhmm(start).unwrap(),
            end: parse_hhmm(end).unwrap(),
        }
    }

    fn input(weekday: i16, start: &str, end: &str) -> AvailabilityRuleInput {
        AvailabilityRuleInput {
            weekday,
            start_time: start.into(),
            end_time: end.into(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    // 2025-03-03 is a Monday (weekday 1).

    #[test]
    fn test_slots_fill_window() {
        let windows = [window(1, "09:00", "10:30")];
        let slots = generate_slots(
            &windows,
            30,
            date("2025-03-03"),
            date("2025-03-03"),
            utc("2025-01-01T00:00:00Z"),
            &[],
        );
        let starts: Vec<_> = slots
            .iter()
            .map(|s| s.starts_at.hour() * 60 + s.starts_at.minute())
            .collect();
        assert_eq!(starts, vec![540, 570, 600]);
        assert_eq!(slots[2].ends_at, utc("2025-03-03T10:30:00Z"));
    }

    #[test]
    fn test_partial_slot_at_window_end_is_dropped() {
        let windows = [window(1, "09:00", "09:50")];
        let slots = generate_slots(
            &windows,
            30,
            date("2025-03-03"),
            date("2025-03-03"),
            utc("2025-01-01T00:00:00Z"),
            &[],
        );
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn test_only_matching_weekdays() {
        let windows = [window(1, "09:00", "10:00")];
        let slots = generate_slots(
            &windows,
            60,
            date("2025-03-03"),
            date("2025-03-16"),
            utc("2025-01-01T00:00:00Z"),
            &[],
        );
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].starts_at, utc("2025-03-03T09:00:00Z"));
        assert_eq!(slots[1].starts_at, utc("2025-03-10T09:00:00Z"));
    }

    #[test]
    fn test_past_slots_are_dropped() {
        let windows = [window(1, "09:00", "11:00")];
        let slots = generate_slots(
            &windows,
            60,
            date("2025-03-03"),
            date("2025-03-03"),
            utc("2025-03-03T09:30:00Z"),
            &[],
        );
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].starts_at, utc("2025-03-03T10:00:00Z"));
    }

    #[test]
    fn test_busy_intervals_are_half_open() {
        let windows = [window(1, "09:00", "11:00")];
        let busy = [(utc("2025-03-03T09:00:00Z"), utc("2025-03-03T10:00:00Z"))];
        let slots = generate_slots(
            &windows,
            60,
            date("2025-03-03"),
            date("2025-03-03"),
            utc("2025-01-01T00:00:00Z"),
            &busy,
        );
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].starts_at, utc("2025-03-03T10:00:00Z"));
    }

    #[test]
    fn test_range_validation() {
        assert!(validate_range(date("2025-03-01"), date("2025-03-31")).is_ok());
        assert!(validate_range(date("2025-03-01"), date("2025-04-01")).is_err());
        assert!(validate_range(date("2025-03-02"), date("2025-03-01")).is_err());
        assert!(validate_range(date("2025-03-01"), date("2025-03-01")).is_ok());
    }

    #[test]
    fn test_rule_validation() {
        assert!(validate_rules(&[input(1, "09:00", "12:00"), input(1, "12:00", "15:00")]).is_ok());
        assert!(validate_rules(&[input(1, "09:00", "12:00"), input(2, "10:00", "11:00")]).is_ok());
        assert!(validate_rules(&[input(1, "09:00", "12:00"), input(1, "11:00", "13:00")]).is_err());
        assert!(validate_rules(&[input(1, "12:00", "12:00")]).is_err());
        assert!(validate_rules(&[input(3, "14:00", "09:00")]).is_err());
        assert!(validate_rules(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_slot_at_alignment() {
        let windows = [window(1, "09:00", "11:00")];
        assert!(slot_at(&windows, 30, utc("2025-03-03T09:30:00Z")).is_some());
        assert!(slot_at(&windows, 30, utc("2025-03-03T09:15:00Z")).is_none());
        assert!(slot_at(&windows, 30, utc("2025-03-03T10:30:00Z")).is_some());
        assert!(slot_at(&windows, 30, utc("2025-03-03T11:00:00Z")).is_none());
        assert!(slot_at(&windows, 30, utc("2025-03-04T09:00:00Z")).is_none());
        let slot = slot_at(&windows, 45, utc("2025-03-03T09:45:00Z")).unwrap();
        assert_eq!(slot.ends_at, utc("2025-03-03T10:30:00Z"));
    }
}
