use crate::core::availability::{filter_availability, is_slot_free, DayBounds};
use crate::core::booking::{validate_request, BookingWriter};
use crate::core::operator::OperatorListing;
use crate::core::slots::{generate_slots, upcoming_days};
use crate::domain::model::{AppointmentId, BookingRequest, Service, SlotAvailability, SlotWindow};
use crate::domain::ports::{AppointmentReader, AppointmentWriter, CatalogReader};
use crate::utils::error::{BookingError, Result};
use crate::utils::validation::Validate;
use chrono::{NaiveDate, NaiveDateTime};

/// 串接目錄、可用時段與寫入器。對同一儲存層的讀寫都經過這裡。
pub struct Scheduler<S>
where
    S: CatalogReader + AppointmentReader + AppointmentWriter + Clone,
{
    store: S,
    writer: BookingWriter<S>,
    window: SlotWindow,
}

impl<S> Scheduler<S>
where
    S: CatalogReader + AppointmentReader + AppointmentWriter + Clone,
{
    pub fn new(store: S, window: SlotWindow) -> Self {
        Self {
            writer: BookingWriter::new(store.clone()),
            store,
            window,
        }
    }

    pub fn window(&self) -> &SlotWindow {
        &self.window
    }

    pub async fn services(&self) -> Result<Vec<Service>> {
        let services = self.store.list_services().await?;
        for service in &services {
            service.validate()?;
        }
        tracing::debug!("Loaded {} services", services.len());
        Ok(services)
    }

    pub async fn find_service(&self, service_id: &str) -> Result<Service> {
        self.services()
            .await?
            .into_iter()
            .find(|s| s.id == service_id)
            .ok_or_else(|| BookingError::validation("service_id", format!("unknown service {}", service_id)))
    }

    /// 可供選擇的日期
    pub fn selectable_days(&self, today: NaiveDate, horizon_days: u32) -> Vec<NaiveDate> {
        upcoming_days(today, horizon_days)
    }

    /// 讀取當日已預約的開始時間，並以半開區間再過濾一次
    pub async fn booked_starts(&self, day: NaiveDate) -> Result<Vec<NaiveDateTime>> {
        let bounds = DayBounds::for_day(day);
        let booked: Vec<NaiveDateTime> = self
            .store
            .list_appointments_for_day(day)
            .await?
            .into_iter()
            .filter(|start| bounds.contains(start))
            .collect();
        tracing::debug!("{} appointments already booked on {}", booked.len(), day);
        Ok(booked)
    }

    pub async fn availability(&self, day: NaiveDate) -> Result<Vec<SlotAvailability>> {
        let booked = self.booked_starts(day).await?;
        let slots = generate_slots(day, &self.window);
        Ok(filter_availability(&slots, &booked))
    }

    /// 送出預約。寫入前先以最新資料檢查時段是否仍空著；這只是提示性的檢查，
    /// 真正的衝突判定在儲存層的唯一性限制。
    pub async fn book(&self, request: &BookingRequest) -> Result<AppointmentId> {
        let appointment = validate_request(request)?;
        let start = appointment.start_time;

        let on_grid = generate_slots(start.date(), &self.window)
            .iter()
            .any(|slot| slot.start == start);
        if !on_grid {
            return Err(BookingError::validation(
                "start_time",
                format!("{} is outside the bookable slots", start),
            ));
        }

        let booked = self.booked_starts(start.date()).await?;
        if !is_slot_free(&start, &booked) {
            tracing::warn!("Slot {} is already booked, asking for a fresh pick", start);
            return Err(BookingError::StaleAvailability { start });
        }

        self.writer.submit_booking(request).await
    }

    pub async fn operator_listing(&self, now: NaiveDateTime) -> Result<OperatorListing> {
        let rows = self.store.list_all_appointments().await?;
        Ok(OperatorListing::build(rows, now))
    }
}
