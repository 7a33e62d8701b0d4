//! 顯示用格式化 (時段按鈕、預約摘要、價格與時長標籤)

use chrono::NaiveDateTime;

/// `9:00 AM`
pub fn slot_label(start: &NaiveDateTime) -> String {
    start.format("%-I:%M %p").to_string()
}

/// `June 10, 10:00 AM`
pub fn summary_label(start: &NaiveDateTime) -> String {
    start.format("%B %-d, %-I:%M %p").to_string()
}

/// `Mon 10` 日期選擇器標籤
pub fn day_label(day: &chrono::NaiveDate) -> String {
    day.format("%a %-d").to_string()
}

/// 價格為零顯示 `Free`，整數價格不顯示小數
pub fn price_label(price: f64) -> String {
    if price == 0.0 {
        "Free".to_string()
    } else if price.fract() == 0.0 {
        format!("${:.0}", price)
    } else {
        format!("${:.2}", price)
    }
}

pub fn duration_label(minutes: u32) -> String {
    format!("{} min", minutes)
}
