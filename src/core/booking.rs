use crate::domain::model::{AppointmentId, BookingRequest, NewAppointment};
use crate::domain::ports::AppointmentWriter;
use crate::utils::error::{BookingError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_required_field};
use std::fmt;

/// 單次預約嘗試的狀態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    Validating,
    Saving,
    Success(AppointmentId),
    Failed(String),
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptState::Idle => f.write_str("idle"),
            AttemptState::Validating => f.write_str("validating"),
            AttemptState::Saving => f.write_str("saving"),
            AttemptState::Success(_) => f.write_str("booked"),
            AttemptState::Failed(_) => f.write_str("failed"),
        }
    }
}

/// `Idle -> Validating -> Saving -> {Success | Failed}`，`Failed` 可回到 `Idle`，
/// `Success` 為終點。
#[derive(Debug, Clone)]
pub struct BookingAttempt {
    state: AttemptState,
}

impl BookingAttempt {
    pub fn new() -> Self {
        Self {
            state: AttemptState::Idle,
        }
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, AttemptState::Validating | AttemptState::Saving)
    }

    fn transition(&mut self, action: &str, next: AttemptState) -> Result<()> {
        let allowed = matches!(
            (&self.state, &next),
            (AttemptState::Idle, AttemptState::Validating)
                | (AttemptState::Validating, AttemptState::Saving)
                | (AttemptState::Validating, AttemptState::Failed(_))
                | (AttemptState::Saving, AttemptState::Success(_))
                | (AttemptState::Saving, AttemptState::Failed(_))
                | (AttemptState::Failed(_), AttemptState::Idle)
        );
        if !allowed {
            return Err(BookingError::InvalidTransition {
                from: self.state.to_string(),
                action: action.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// 失敗後回到可編輯狀態
    pub fn reset(&mut self) -> Result<()> {
        self.transition("edit the booking", AttemptState::Idle)
    }
}

impl Default for BookingAttempt {
    fn default() -> Self {
        Self::new()
    }
}

/// 檢查四個必填欄位並產生寫入內容；任何缺漏都不會觸及儲存層
pub fn validate_request(request: &BookingRequest) -> Result<NewAppointment> {
    let service_id = validate_required_field("service_id", &request.service_id)?;
    let start_time = validate_required_field("start_time", &request.start_time)?;
    validate_non_empty_string("service_id", service_id)?;
    validate_non_empty_string("customer_name", &request.customer_name)?;
    validate_non_empty_string("customer_email", &request.customer_email)?;

    Ok(NewAppointment {
        service_id: service_id.clone(),
        customer_name: request.customer_name.trim().to_string(),
        customer_email: request.customer_email.trim().to_string(),
        start_time: *start_time,
    })
}

/// 預約寫入器：驗證後只發出一次新增，不重試，也不自行檢查重複；
/// 開始時間的唯一性由儲存層保證。
pub struct BookingWriter<W: AppointmentWriter> {
    writer: W,
}

impl<W: AppointmentWriter> BookingWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn submit_booking(&self, request: &BookingRequest) -> Result<AppointmentId> {
        let appointment = validate_request(request)?;

        tracing::debug!(
            "Inserting appointment for service {} at {}",
            appointment.service_id,
            appointment.start_time
        );

        match self.writer.insert_appointment(&appointment).await {
            Ok(id) => {
                tracing::info!("✅ Appointment {} booked at {}", id, appointment.start_time);
                Ok(id)
            }
            Err(e) => {
                if e.is_slot_taken() {
                    tracing::warn!("Slot {} was taken before the insert landed", appointment.start_time);
                } else {
                    tracing::error!("❌ Appointment insert failed: {}", e);
                }
                Err(e)
            }
        }
    }

    /// 與 `submit_booking` 相同，並同步推進 `attempt` 的狀態
    pub async fn submit_tracked(
        &self,
        attempt: &mut BookingAttempt,
        request: &BookingRequest,
    ) -> Result<AppointmentId> {
        attempt.transition("submit", AttemptState::Validating)?;

        let appointment = match validate_request(request) {
            Ok(appointment) => appointment,
            Err(e) => {
                attempt.transition("fail", AttemptState::Failed(e.to_string()))?;
                return Err(e);
            }
        };

        attempt.transition("save", AttemptState::Saving)?;

        match self.writer.insert_appointment(&appointment).await {
            Ok(id) => {
                attempt.transition("confirm", AttemptState::Success(id.clone()))?;
                Ok(id)
            }
            Err(e) => {
                attempt.transition("fail", AttemptState::Failed(e.to_string()))?;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::PersistenceKind;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingWriter {
        inserts: Arc<Mutex<Vec<NewAppointment>>>,
        fail_with: Option<PersistenceKind>,
    }

    #[async_trait]
    impl AppointmentWriter for RecordingWriter {
        async fn insert_appointment(&self, appointment: &NewAppointment) -> Result<AppointmentId> {
            let mut inserts = self.inserts.lock().await;
            inserts.push(appointment.clone());
            match self.fail_with {
                Some(kind) => Err(BookingError::persistence(kind, "store said no")),
                None => Ok(format!("apt-{}", inserts.len())),
            }
        }
    }

    fn ten_am() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn valid_request() -> BookingRequest {
        BookingRequest::new("S1", ten_am(), "Jane", "jane@x.com")
    }

    #[tokio::test]
    async fn test_valid_request_inserts_once() {
        let writer = RecordingWriter::default();
        let booking = BookingWriter::new(writer.clone());

        let id = booking.submit_booking(&valid_request()).await.unwrap();

        assert_eq!(id, "apt-1");
        let inserts = writer.inserts.lock().await;
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].service_id, "S1");
        assert_eq!(inserts[0].start_time, ten_am());
    }

    #[tokio::test]
    async fn test_invalid_requests_never_write() {
        let writer = RecordingWriter::default();
        let booking = BookingWriter::new(writer.clone());

        let mut missing_service = valid_request();
        missing_service.service_id = None;
        let mut missing_start = valid_request();
        missing_start.start_time = None;
        let mut empty_name = valid_request();
        empty_name.customer_name = "  ".to_string();
        let mut empty_email = valid_request();
        empty_email.customer_email = String::new();

        for request in [missing_service, missing_start, empty_name, empty_email] {
            let err = booking.submit_booking(&request).await.unwrap_err();
            assert!(matches!(err, BookingError::Validation { .. }), "{:?}", err);
        }

        assert!(writer.inserts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_persistence_error() {
        let writer = RecordingWriter {
            fail_with: Some(PersistenceKind::Timeout),
            ..Default::default()
        };
        let booking = BookingWriter::new(writer.clone());

        let err = booking.submit_booking(&valid_request()).await.unwrap_err();

        assert!(matches!(
            err,
            BookingError::Persistence {
                kind: PersistenceKind::Timeout,
                ..
            }
        ));
        // 不重試
        assert_eq!(writer.inserts.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_tracked_success_is_terminal() {
        let booking = BookingWriter::new(RecordingWriter::default());
        let mut attempt = BookingAttempt::new();

        booking.submit_tracked(&mut attempt, &valid_request()).await.unwrap();

        assert_eq!(attempt.state(), &AttemptState::Success("apt-1".to_string()));
        assert!(attempt.reset().is_err());
        let again = booking.submit_tracked(&mut attempt, &valid_request()).await;
        assert!(matches!(again, Err(BookingError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_tracked_failure_returns_to_idle() {
        let writer = RecordingWriter {
            fail_with: Some(PersistenceKind::Conflict),
            ..Default::default()
        };
        let booking = BookingWriter::new(writer);
        let mut attempt = BookingAttempt::new();

        let err = booking
            .submit_tracked(&mut attempt, &valid_request())
            .await
            .unwrap_err();

        assert!(err.is_slot_taken());
        assert!(matches!(attempt.state(), AttemptState::Failed(_)));
        attempt.reset().unwrap();
        assert_eq!(attempt.state(), &AttemptState::Idle);
    }

    #[tokio::test]
    async fn test_tracked_validation_failure() {
        let booking = BookingWriter::new(RecordingWriter::default());
        let mut attempt = BookingAttempt::new();
        let mut request = valid_request();
        request.customer_email = String::new();

        assert!(booking.submit_tracked(&mut attempt, &request).await.is_err());
        assert!(matches!(attempt.state(), AttemptState::Failed(_)));
        assert!(!attempt.is_in_flight());
    }

    #[test]
    fn test_validate_request_trims_contact() {
        let mut request = valid_request();
        request.customer_name = " Jane ".to_string();
        let appointment = validate_request(&request).unwrap();
        assert_eq!(appointment.customer_name, "Jane");
    }
}
