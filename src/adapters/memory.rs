use crate::core::availability::{minute_key, DayBounds};
use crate::domain::model::{
    Appointment, AppointmentId, AppointmentSummary, NewAppointment, Service,
};
use crate::domain::ports::{AppointmentReader, AppointmentWriter, CatalogReader};
use crate::utils::error::{BookingError, PersistenceKind, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    services: Vec<Service>,
    appointments: Vec<Appointment>,
}

impl MemoryState {
    /// 唯一性以分鐘為單位，與可預約時段的比對一致
    fn is_taken(&self, start: &NaiveDateTime) -> bool {
        let key = minute_key(start);
        self.appointments
            .iter()
            .any(|a| minute_key(&a.start_time) == key)
    }
}

/// 行程內的儲存層，開始時間具唯一性 (檢查與寫入在同一把鎖內完成)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new(services: Vec<Service>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                services,
                appointments: Vec::new(),
            })),
        }
    }

    /// 本機試用的預設服務目錄
    pub fn with_sample_catalog() -> Self {
        Self::new(vec![
            Service {
                id: "consultation".to_string(),
                name: "Consultation".to_string(),
                duration: 30,
                price: 45.0,
                description: "A one-on-one session to talk through your goals.".to_string(),
            },
            Service {
                id: "follow-up".to_string(),
                name: "Follow-up".to_string(),
                duration: 30,
                price: 0.0,
                description: "Quick check-in after a previous visit.".to_string(),
            },
            Service {
                id: "deep-tissue".to_string(),
                name: "Deep Tissue Massage".to_string(),
                duration: 60,
                price: 90.0,
                description: "Full hour of focused massage therapy.".to_string(),
            },
        ])
    }

    pub async fn appointments(&self) -> Vec<Appointment> {
        self.state.lock().await.appointments.clone()
    }

    /// 直接放入既有預約 (測試與匯入用)，同樣遵守唯一性
    pub async fn seed_appointment(&self, appointment: Appointment) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.is_taken(&appointment.start_time) {
            return Err(duplicate(&appointment.start_time));
        }
        state.appointments.push(appointment);
        Ok(())
    }
}

fn duplicate(start: &NaiveDateTime) -> BookingError {
    BookingError::persistence(
        PersistenceKind::Conflict,
        format!("duplicate key value violates unique constraint on start_time ({})", start),
    )
}

#[async_trait]
impl CatalogReader for MemoryStore {
    async fn list_services(&self) -> Result<Vec<Service>> {
        Ok(self.state.lock().await.services.clone())
    }
}

#[async_trait]
impl AppointmentReader for MemoryStore {
    async fn list_appointments_for_day(&self, day: NaiveDate) -> Result<Vec<NaiveDateTime>> {
        let bounds = DayBounds::for_day(day);
        let state = self.state.lock().await;
        Ok(state
            .appointments
            .iter()
            .map(|a| a.start_time)
            .filter(|start| bounds.contains(start))
            .collect())
    }

    async fn list_all_appointments(&self) -> Result<Vec<AppointmentSummary>> {
        let state = self.state.lock().await;
        let mut rows: Vec<AppointmentSummary> = state
            .appointments
            .iter()
            .map(|a| {
                let service = state.services.iter().find(|s| s.id == a.service_id);
                AppointmentSummary {
                    appointment: a.clone(),
                    service_name: service.map(|s| s.name.clone()).unwrap_or_default(),
                    service_price: service.map(|s| s.price).unwrap_or_default(),
                }
            })
            .collect();
        rows.sort_by_key(|row| row.appointment.start_time);
        Ok(rows)
    }
}

#[async_trait]
impl AppointmentWriter for MemoryStore {
    async fn insert_appointment(&self, appointment: &NewAppointment) -> Result<AppointmentId> {
        let mut state = self.state.lock().await;

        if !state.services.iter().any(|s| s.id == appointment.service_id) {
            return Err(BookingError::persistence(
                PersistenceKind::Rejected,
                format!("service {} does not exist", appointment.service_id),
            ));
        }
        if state.is_taken(&appointment.start_time) {
            return Err(duplicate(&appointment.start_time));
        }

        let id = uuid::Uuid::new_v4().to_string();
        state.appointments.push(Appointment {
            id: id.clone(),
            service_id: appointment.service_id.clone(),
            customer_name: appointment.customer_name.clone(),
            customer_email: appointment.customer_email.clone(),
            start_time: appointment.start_time,
        });
        Ok(id)
    }
}
