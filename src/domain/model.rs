use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::utils::error::{BookingError, Result};
use crate::utils::validation::Validate;

pub type ServiceId = String;
pub type AppointmentId = String;

/// 可預約的服務項目 (由目錄來源擁有，核心只讀)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    /// 分鐘
    pub duration: u32,
    pub price: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Validate for Service {
    fn validate(&self) -> Result<()> {
        if self.duration == 0 {
            return Err(BookingError::persistence(
                crate::utils::error::PersistenceKind::MalformedResponse,
                format!("service {} has a zero duration", self.id),
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(BookingError::persistence(
                crate::utils::error::PersistenceKind::MalformedResponse,
                format!("service {} has an invalid price {}", self.id, self.price),
            ));
        }
        Ok(())
    }
}

/// 每日營業時段與格線
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotWindow {
    pub open_hour: u32,
    pub close_hour: u32,
    pub step_minutes: u32,
}

impl SlotWindow {
    pub const DEFAULT_OPEN_HOUR: u32 = 9;
    pub const DEFAULT_CLOSE_HOUR: u32 = 17;
    pub const DEFAULT_STEP_MINUTES: u32 = 30;

    pub fn new(open_hour: u32, close_hour: u32, step_minutes: u32) -> Self {
        Self {
            open_hour,
            close_hour,
            step_minutes,
        }
    }
}

impl Default for SlotWindow {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_OPEN_HOUR,
            Self::DEFAULT_CLOSE_HOUR,
            Self::DEFAULT_STEP_MINUTES,
        )
    }
}

impl Validate for SlotWindow {
    fn validate(&self) -> Result<()> {
        crate::utils::validation::validate_range("schedule.open_hour", self.open_hour, 0, 24)?;
        crate::utils::validation::validate_range("schedule.close_hour", self.close_hour, 0, 24)?;
        crate::utils::validation::validate_positive_number(
            "schedule.step_minutes",
            u64::from(self.step_minutes),
            1,
        )
    }
}

/// 時段長度取自格線，而非服務本身的時長
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
}

impl Slot {
    pub fn end(&self) -> NaiveDateTime {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    pub slot: Slot,
    pub is_taken: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub service_id: ServiceId,
    pub customer_name: String,
    pub customer_email: String,
    pub start_time: NaiveDateTime,
}

/// 管理端清單列：附帶服務名稱與價格
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentSummary {
    pub appointment: Appointment,
    pub service_name: String,
    pub service_price: f64,
}

/// 使用者送出的預約意圖，四個欄位在送出前都必須有值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingRequest {
    pub service_id: Option<ServiceId>,
    pub start_time: Option<NaiveDateTime>,
    pub customer_name: String,
    pub customer_email: String,
}

impl BookingRequest {
    pub fn new(
        service_id: impl Into<ServiceId>,
        start_time: NaiveDateTime,
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
    ) -> Self {
        Self {
            service_id: Some(service_id.into()),
            start_time: Some(start_time),
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
        }
    }
}

/// 通過驗證、可直接寫入的預約
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAppointment {
    pub service_id: ServiceId,
    pub customer_name: String,
    pub customer_email: String,
    pub start_time: NaiveDateTime,
}
