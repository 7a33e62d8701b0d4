pub mod availability;
pub mod booking;
pub mod flow;
pub mod operator;
pub mod scheduler;
pub mod slots;

pub use crate::domain::model::{
    Appointment, AppointmentSummary, BookingRequest, Service, Slot, SlotAvailability, SlotWindow,
};
pub use crate::domain::ports::{AppointmentReader, AppointmentWriter, CatalogReader, ConfigProvider};
pub use crate::utils::error::Result;
