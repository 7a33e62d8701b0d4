//! 預約精靈的狀態機。
//!
//! 服務、日期、時段與送出狀態合併為單一列舉，每個狀態只攜帶該步驟成立所需的資料，
//! 例如「已選時段但未選服務」這種組合無法被表達。

use crate::core::booking::validate_request;
use crate::domain::model::{AppointmentId, BookingRequest, Service, Slot, SlotAvailability};
use crate::utils::error::{BookingError, Result};
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq)]
pub enum BookingFlow {
    SelectingService,
    SelectingDate {
        service: Service,
        /// 送出時遇到時段被搶先預約，需重新讀取這一天的可用時段
        stale_day: Option<NaiveDate>,
    },
    SelectingTime {
        service: Service,
        day: NaiveDate,
        availability: Vec<SlotAvailability>,
    },
    EnteringDetails {
        service: Service,
        day: NaiveDate,
        availability: Vec<SlotAvailability>,
        slot: Slot,
        customer_name: String,
        customer_email: String,
    },
    Saving {
        service: Service,
        day: NaiveDate,
        availability: Vec<SlotAvailability>,
        request: BookingRequest,
        slot: Slot,
    },
    Done {
        service: Service,
        slot: Slot,
        appointment_id: AppointmentId,
        customer_email: String,
    },
}

impl BookingFlow {
    pub fn new() -> Self {
        BookingFlow::SelectingService
    }

    pub fn step_name(&self) -> &'static str {
        match self {
            BookingFlow::SelectingService => "selecting a service",
            BookingFlow::SelectingDate { .. } => "selecting a date",
            BookingFlow::SelectingTime { .. } => "selecting a time",
            BookingFlow::EnteringDetails { .. } => "entering details",
            BookingFlow::Saving { .. } => "saving",
            BookingFlow::Done { .. } => "done",
        }
    }

    pub fn service(&self) -> Option<&Service> {
        match self {
            BookingFlow::SelectingService => None,
            BookingFlow::SelectingDate { service, .. }
            | BookingFlow::SelectingTime { service, .. }
            | BookingFlow::EnteringDetails { service, .. }
            | BookingFlow::Saving { service, .. }
            | BookingFlow::Done { service, .. } => Some(service),
        }
    }

    /// 送出中不可再送出 (UI 需顯示忙碌狀態)
    pub fn is_busy(&self) -> bool {
        matches!(self, BookingFlow::Saving { .. })
    }

    fn invalid(&self, action: &str) -> BookingError {
        BookingError::InvalidTransition {
            from: self.step_name().to_string(),
            action: action.to_string(),
        }
    }

    pub fn select_service(&mut self, service: Service) -> Result<()> {
        match self {
            BookingFlow::SelectingService => {
                *self = BookingFlow::SelectingDate {
                    service,
                    stale_day: None,
                };
                Ok(())
            }
            _ => Err(self.invalid("select a service")),
        }
    }

    /// 選擇 (或變更) 日期，`availability` 為該日最新的時段分類
    pub fn select_date(&mut self, day: NaiveDate, availability: Vec<SlotAvailability>) -> Result<()> {
        match self {
            BookingFlow::SelectingDate { service, .. }
            | BookingFlow::SelectingTime { service, .. }
            | BookingFlow::EnteringDetails { service, .. } => {
                *self = BookingFlow::SelectingTime {
                    service: service.clone(),
                    day,
                    availability,
                };
                Ok(())
            }
            _ => Err(self.invalid("select a date")),
        }
    }

    /// 選擇 (或變更) 時段；已被預約或不在當日格線上的時段會被拒絕
    pub fn select_slot(&mut self, start: NaiveDateTime) -> Result<()> {
        let (service, day, availability, name, email) = match self {
            BookingFlow::SelectingTime {
                service,
                day,
                availability,
            } => (service, day, availability, String::new(), String::new()),
            BookingFlow::EnteringDetails {
                service,
                day,
                availability,
                customer_name,
                customer_email,
                ..
            } => (
                service,
                day,
                availability,
                customer_name.clone(),
                customer_email.clone(),
            ),
            _ => return Err(self.invalid("select a time")),
        };

        let chosen = availability
            .iter()
            .find(|a| a.slot.start == start)
            .ok_or_else(|| BookingError::validation("start_time", format!("{} is not a bookable slot", start)))?;
        if chosen.is_taken {
            return Err(BookingError::validation(
                "start_time",
                format!("{} is already taken", start),
            ));
        }

        *self = BookingFlow::EnteringDetails {
            service: service.clone(),
            day: *day,
            slot: chosen.slot,
            availability: availability.clone(),
            customer_name: name,
            customer_email: email,
        };
        Ok(())
    }

    pub fn set_details(&mut self, name: &str, email: &str) -> Result<()> {
        match self {
            BookingFlow::EnteringDetails {
                customer_name,
                customer_email,
                ..
            } => {
                *customer_name = name.to_string();
                *customer_email = email.to_string();
                Ok(())
            }
            _ => Err(self.invalid("enter contact details")),
        }
    }

    /// 進入 `Saving` 並回傳要交給寫入器的請求；欄位不完整時停留在原狀態
    pub fn begin_submit(&mut self) -> Result<BookingRequest> {
        match self {
            BookingFlow::EnteringDetails {
                service,
                day,
                availability,
                slot,
                customer_name,
                customer_email,
            } => {
                let request = BookingRequest::new(
                    service.id.clone(),
                    slot.start,
                    customer_name.clone(),
                    customer_email.clone(),
                );
                validate_request(&request)?;

                *self = BookingFlow::Saving {
                    service: service.clone(),
                    day: *day,
                    availability: availability.clone(),
                    request: request.clone(),
                    slot: *slot,
                };
                Ok(request)
            }
            _ => Err(self.invalid("submit")),
        }
    }

    /// 套用寫入結果。成功進入 `Done`；時段被搶先預約時丟棄選擇並要求重新讀取該日；
    /// 其他錯誤回到可編輯的明細步驟。
    pub fn complete(&mut self, outcome: &Result<AppointmentId>) -> Result<()> {
        let BookingFlow::Saving {
            service,
            day,
            availability,
            request,
            slot,
        } = self
        else {
            return Err(self.invalid("finish saving"));
        };

        *self = match outcome {
            Ok(id) => BookingFlow::Done {
                service: service.clone(),
                slot: *slot,
                appointment_id: id.clone(),
                customer_email: request.customer_email.clone(),
            },
            Err(e) if e.is_slot_taken() => BookingFlow::SelectingDate {
                service: service.clone(),
                stale_day: Some(*day),
            },
            Err(_) => BookingFlow::EnteringDetails {
                service: service.clone(),
                day: *day,
                availability: availability.clone(),
                slot: *slot,
                customer_name: request.customer_name.clone(),
                customer_email: request.customer_email.clone(),
            },
        };
        Ok(())
    }

    /// 回到服務清單 (返回鍵或「再預約一次」)，未送出的選擇不會被保存
    pub fn reset(&mut self) -> Result<()> {
        if self.is_busy() {
            return Err(self.invalid("start over"));
        }
        *self = BookingFlow::SelectingService;
        Ok(())
    }
}

impl Default for BookingFlow {
    fn default() -> Self {
        Self::new()
    }
}
