use crate::domain::model::AppointmentSummary;
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingEntry {
    pub summary: AppointmentSummary,
    /// 開始時間已過
    pub is_finished: bool,
}

/// 管理端預約總覽
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorListing {
    pub entries: Vec<ListingEntry>,
}

impl OperatorListing {
    /// 依開始時間遞增排序 (儲存層已排序時不改變順序)
    pub fn build(mut rows: Vec<AppointmentSummary>, now: NaiveDateTime) -> Self {
        rows.sort_by_key(|row| row.appointment.start_time);

        let entries = rows
            .into_iter()
            .map(|summary| ListingEntry {
                is_finished: summary.appointment.start_time < now,
                summary,
            })
            .collect();

        Self { entries }
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn upcoming(&self) -> impl Iterator<Item = &ListingEntry> {
        self.entries.iter().filter(|e| !e.is_finished)
    }
}
