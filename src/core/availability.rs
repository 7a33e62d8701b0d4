use crate::domain::model::{Slot, SlotAvailability};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::collections::HashSet;

/// 半開區間 `[當日 00:00, 隔日 00:00)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBounds {
    pub start: NaiveDateTime,
    pub end_exclusive: NaiveDateTime,
}

impl DayBounds {
    pub fn for_day(day: NaiveDate) -> Self {
        let start = day.and_time(NaiveTime::MIN);
        Self {
            start,
            end_exclusive: start + Duration::days(1),
        }
    }

    pub fn contains(&self, instant: &NaiveDateTime) -> bool {
        *instant >= self.start && *instant < self.end_exclusive
    }
}

pub(crate) type MinuteKey = (NaiveDate, u32, u32);

/// 預約比對的最小單位：同一分鐘內的開始時間視為同一時段
pub(crate) fn minute_key(instant: &NaiveDateTime) -> MinuteKey {
    (instant.date(), instant.hour(), instant.minute())
}

/// 標記每個時段是否已被預約。比對精確到分鐘，不做區間重疊判斷；
/// 輸出順序與輸入一致，不會丟棄任何時段。
pub fn filter_availability(slots: &[Slot], booked_starts: &[NaiveDateTime]) -> Vec<SlotAvailability> {
    let booked: HashSet<MinuteKey> = booked_starts.iter().map(minute_key).collect();

    slots
        .iter()
        .map(|slot| SlotAvailability {
            slot: *slot,
            is_taken: booked.contains(&minute_key(&slot.start)),
        })
        .collect()
}

pub fn free_slots(availability: &[SlotAvailability]) -> Vec<Slot> {
    availability
        .iter()
        .filter(|a| !a.is_taken)
        .map(|a| a.slot)
        .collect()
}

pub fn is_slot_free(start: &NaiveDateTime, booked_starts: &[NaiveDateTime]) -> bool {
    let key = minute_key(start);
    !booked_starts.iter().any(|b| minute_key(b) == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::slots::generate_slots;
    use crate::domain::model::SlotWindow;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_first_two_slots_taken() {
        let slots = generate_slots(day(), &SlotWindow::default());
        let result = filter_availability(&slots, &[at(9, 0, 0), at(9, 30, 0)]);

        assert_eq!(result.len(), 16);
        assert!(result[0].is_taken);
        assert!(result[1].is_taken);
        assert!(result[2..].iter().all(|a| !a.is_taken));
    }

    #[test]
    fn test_match_is_minute_granular() {
        let slots = generate_slots(day(), &SlotWindow::default());
        // 同一分鐘內的秒數差異仍視為相同
        let result = filter_availability(&slots, &[at(10, 0, 42)]);
        assert!(result[2].is_taken);

        // 落在時段中間不算佔用
        let result = filter_availability(&slots, &[at(10, 15, 0)]);
        assert!(result.iter().all(|a| !a.is_taken));
    }

    #[test]
    fn test_order_preserved_and_pure() {
        let slots = generate_slots(day(), &SlotWindow::default());
        let booked = [at(12, 0, 0), at(15, 30, 0)];

        let first = filter_availability(&slots, &booked);
        let second = filter_availability(&slots, &booked);

        assert_eq!(first, second);
        let starts: Vec<_> = first.iter().map(|a| a.slot).collect();
        assert_eq!(starts, slots);
    }

    #[test]
    fn test_taken_count_bounded() {
        let slots = generate_slots(day(), &SlotWindow::default());
        let booked = vec![at(9, 0, 0), at(9, 0, 0), at(20, 0, 0)];
        let taken = filter_availability(&slots, &booked)
            .iter()
            .filter(|a| a.is_taken)
            .count();
        assert_eq!(taken, 1);
        assert!(taken <= booked.len().min(16));
    }

    #[test]
    fn test_other_day_not_matched() {
        let slots = generate_slots(day(), &SlotWindow::default());
        let next_day = NaiveDate::from_ymd_opt(2024, 6, 11)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let result = filter_availability(&slots, &[next_day]);
        assert!(result.iter().all(|a| !a.is_taken));
    }

    #[test]
    fn test_free_slots() {
        let slots = generate_slots(day(), &SlotWindow::default());
        let result = filter_availability(&slots, &[at(9, 0, 0)]);
        let free = free_slots(&result);
        assert_eq!(free.len(), 15);
        assert_eq!(free[0].start, at(9, 30, 0));
    }

    #[test]
    fn test_is_slot_free() {
        assert!(!is_slot_free(&at(9, 0, 0), &[at(9, 0, 30)]));
        assert!(is_slot_free(&at(9, 30, 0), &[at(9, 0, 0)]));
    }

    #[test]
    fn test_day_bounds_half_open() {
        let bounds = DayBounds::for_day(day());
        assert!(bounds.contains(&at(0, 0, 0)));
        assert!(bounds.contains(&at(23, 59, 59)));

        let next_midnight = NaiveDate::from_ymd_opt(2024, 6, 11)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(!bounds.contains(&next_midnight));
        assert_eq!(bounds.end_exclusive, next_midnight);
    }
}
