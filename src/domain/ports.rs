use crate::domain::model::{
    AppointmentId, AppointmentSummary, NewAppointment, Service, SlotWindow,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

/// 服務目錄 (唯讀)
#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn list_services(&self) -> Result<Vec<Service>>;
}

#[async_trait]
pub trait AppointmentReader: Send + Sync {
    /// 指定日期 `[00:00, 隔日 00:00)` 內所有預約的開始時間
    async fn list_appointments_for_day(&self, day: NaiveDate) -> Result<Vec<NaiveDateTime>>;

    /// 全部預約，依開始時間遞增排序
    async fn list_all_appointments(&self) -> Result<Vec<AppointmentSummary>>;
}

/// 寫入端必須對開始時間維持唯一性，衝突時回傳 `PersistenceKind::Conflict`
#[async_trait]
pub trait AppointmentWriter: Send + Sync {
    async fn insert_appointment(&self, appointment: &NewAppointment) -> Result<AppointmentId>;
}

pub trait ConfigProvider: Send + Sync {
    fn store_endpoint(&self) -> &str;
    fn api_key(&self) -> Option<&str>;
    fn operator_token(&self) -> Option<&str>;
    fn timeout_seconds(&self) -> u64;
    fn slot_window(&self) -> SlotWindow;
    fn booking_horizon_days(&self) -> u32;
}
