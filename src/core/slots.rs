use crate::domain::model::{Slot, SlotWindow};
use chrono::{Duration, NaiveDate, NaiveTime};

/// 產生某日的候選時段：從開店時間起每隔 `step_minutes` 一格，嚴格早於關店時間。
///
/// 預設視窗 (9/17/30) 每天固定 16 格，09:00 到 16:30。
pub fn generate_slots(day: NaiveDate, window: &SlotWindow) -> Vec<Slot> {
    if window.open_hour >= window.close_hour || window.step_minutes == 0 {
        return Vec::new();
    }

    let midnight = day.and_time(NaiveTime::MIN);
    let close = midnight + Duration::hours(i64::from(window.close_hour));
    let step = Duration::minutes(i64::from(window.step_minutes));

    let mut slots = Vec::new();
    let mut current = midnight + Duration::hours(i64::from(window.open_hour));
    while current < close {
        slots.push(Slot {
            start: current,
            duration_minutes: window.step_minutes,
        });
        current += step;
    }

    slots
}

/// 日期選擇器可選的日子，從 `today` 起連續 `count` 天
pub fn upcoming_days(today: NaiveDate, count: u32) -> Vec<NaiveDate> {
    today.iter_days().take(count as usize).collect()
}
