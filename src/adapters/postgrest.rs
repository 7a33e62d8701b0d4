//! PostgREST (Supabase REST) 儲存層。
//!
//! 資料表：`booking_services`、`booking_appointments`。後者在 `start_time` 上需有唯一性限制，
//! 重複寫入時 PostgREST 回傳 409 (`23505`)，此處對應為 `PersistenceKind::Conflict`。

use crate::core::availability::DayBounds;
use crate::domain::model::{
    Appointment, AppointmentId, AppointmentSummary, NewAppointment, Service,
};
use crate::domain::ports::{AppointmentReader, AppointmentWriter, CatalogReader, ConfigProvider};
use crate::utils::error::{BookingError, PersistenceKind, Result};
use async_trait::async_trait;
use chrono::{
    DateTime, Duration as ChronoDuration, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime,
    SecondsFormat, TimeZone, Utc,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICES_TABLE: &str = "booking_services";
const APPOINTMENTS_TABLE: &str = "booking_appointments";

/// 本機時間轉為 UTC RFC 3339 (`2024-06-10T08:00:00Z`)；不存在的本機時間 (夏令時間跳躍) 視為輸入錯誤
pub fn local_to_utc_string(instant: &NaiveDateTime) -> Result<String> {
    let local = Local
        .from_local_datetime(instant)
        .earliest()
        .ok_or_else(|| {
            BookingError::validation(
                "start_time",
                format!("{} does not exist in the local timezone", instant),
            )
        })?;
    Ok(local
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// 時鐘跳躍最長不超過一天
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// 找出 `instant` 當下或之後第一個存在的本機時間 (逐分鐘往後找)
fn first_valid_instant<T>(
    instant: &NaiveDateTime,
    resolve: impl Fn(&NaiveDateTime) -> LocalResult<T>,
) -> Option<T> {
    (0..=MAX_GAP_MINUTES).find_map(|offset| {
        let candidate = *instant + ChronoDuration::minutes(offset);
        resolve(&candidate).earliest()
    })
}

/// 日界線專用：若本機午夜落在夏令時間跳躍內，改用跳躍後第一個有效時間
fn day_bound_to_utc_string(instant: &NaiveDateTime) -> Result<String> {
    let local = first_valid_instant(instant, |n| Local.from_local_datetime(n)).ok_or_else(|| {
        BookingError::validation(
            "day",
            format!("no valid local time at or after {}", instant),
        )
    })?;
    Ok(local
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn to_local_naive(instant: &DateTime<FixedOffset>) -> NaiveDateTime {
    instant.with_timezone(&Local).naive_local()
}

/// PostgREST 的主鍵可能是 uuid 字串或整數
fn id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct StartRow {
    start_time: DateTime<FixedOffset>,
}

#[derive(Debug, Deserialize)]
struct InsertedRow {
    id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ServiceRef {
    name: String,
    price: f64,
}

#[derive(Debug, Deserialize)]
struct AppointmentRow {
    id: serde_json::Value,
    service_id: serde_json::Value,
    customer_name: String,
    customer_email: String,
    start_time: DateTime<FixedOffset>,
    booking_services: Option<ServiceRef>,
}

#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    service_id: &'a str,
    customer_name: &'a str,
    customer_email: &'a str,
    start_time: String,
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    operator_token: Option<String>,
}

impl PostgrestStore {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        operator_token: Option<String>,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            operator_token,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.store_endpoint(),
            config.api_key().map(str::to_string),
            config.operator_token().map(str::to_string),
            config.timeout_seconds(),
        )
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    /// `apikey` 標頭加上 Bearer 憑證；管理端清單改用操作員憑證，由伺服器端驗證
    fn authorize(&self, request: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
        let mut request = request;
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        if let Some(token) = bearer.or(self.api_key.as_deref()) {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        tracing::debug!("📡 Store response status: {}", status);

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let parsed: Option<PostgrestErrorBody> = serde_json::from_str(&body).ok();
        let code = parsed.as_ref().and_then(|p| p.code.clone());
        let message = parsed
            .and_then(|p| p.message)
            .unwrap_or_else(|| format!("store request failed with status: {}", status));

        // 409 也可能是外鍵錯誤 (23503)，只有唯一性衝突才算時段被搶
        let kind = match (status, code.as_deref()) {
            (_, Some("23505")) => PersistenceKind::Conflict,
            (StatusCode::CONFLICT, None) => PersistenceKind::Conflict,
            (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => PersistenceKind::Unauthorized,
            (StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT, _) => {
                PersistenceKind::Timeout
            }
            _ => PersistenceKind::Rejected,
        };

        Err(BookingError::persistence(kind, message))
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            BookingError::persistence(
                PersistenceKind::MalformedResponse,
                format!("unexpected store payload: {}", e),
            )
        })
    }
}

#[async_trait]
impl CatalogReader for PostgrestStore {
    async fn list_services(&self) -> Result<Vec<Service>> {
        let url = self.table_url(SERVICES_TABLE);
        tracing::debug!("Fetching services from: {}", url);

        let request = self.authorize(self.client.get(&url), None).query(&[("select", "*")]);
        let response = Self::check(request.send().await?).await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl AppointmentReader for PostgrestStore {
    async fn list_appointments_for_day(&self, day: NaiveDate) -> Result<Vec<NaiveDateTime>> {
        let bounds = DayBounds::for_day(day);
        let range = format!(
            "(start_time.gte.{},start_time.lt.{})",
            day_bound_to_utc_string(&bounds.start)?,
            day_bound_to_utc_string(&bounds.end_exclusive)?
        );
        let url = self.table_url(APPOINTMENTS_TABLE);
        tracing::debug!("Fetching booked slots for {} from: {}", day, url);

        let request = self
            .authorize(self.client.get(&url), None)
            .query(&[("select", "start_time"), ("and", range.as_str())]);
        let response = Self::check(request.send().await?).await?;
        let rows: Vec<StartRow> = Self::decode(response).await?;

        Ok(rows.iter().map(|r| to_local_naive(&r.start_time)).collect())
    }

    async fn list_all_appointments(&self) -> Result<Vec<AppointmentSummary>> {
        let url = self.table_url(APPOINTMENTS_TABLE);
        tracing::debug!("Fetching all appointments from: {}", url);

        let request = self
            .authorize(self.client.get(&url), self.operator_token.as_deref())
            .query(&[
                ("select", "*,booking_services(name,price)"),
                ("order", "start_time.asc"),
            ]);
        let response = Self::check(request.send().await?).await?;
        let rows: Vec<AppointmentRow> = Self::decode(response).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let (service_name, service_price) = row
                    .booking_services
                    .map(|s| (s.name, s.price))
                    .unwrap_or_default();
                AppointmentSummary {
                    appointment: Appointment {
                        id: id_to_string(&row.id),
                        service_id: id_to_string(&row.service_id),
                        customer_name: row.customer_name,
                        customer_email: row.customer_email,
                        start_time: to_local_naive(&row.start_time),
                    },
                    service_name,
                    service_price,
                }
            })
            .collect())
    }
}

#[async_trait]
impl AppointmentWriter for PostgrestStore {
    async fn insert_appointment(&self, appointment: &NewAppointment) -> Result<AppointmentId> {
        let url = self.table_url(APPOINTMENTS_TABLE);
        let payload = [InsertRow {
            service_id: &appointment.service_id,
            customer_name: &appointment.customer_name,
            customer_email: &appointment.customer_email,
            start_time: local_to_utc_string(&appointment.start_time)?,
        }];
        tracing::debug!("Posting appointment to: {}", url);

        let request = self
            .authorize(self.client.post(&url), None)
            .header("Prefer", "return=representation")
            .json(&payload);
        let response = Self::check(request.send().await?).await?;
        let rows: Vec<InsertedRow> = Self::decode(response).await?;

        rows.first().map(|row| id_to_string(&row.id)).ok_or_else(|| {
            BookingError::persistence(
                PersistenceKind::MalformedResponse,
                "insert returned no rows",
            )
        })
    }
}
