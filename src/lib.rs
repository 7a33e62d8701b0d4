pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::{StoreKind, TomlConfig};

pub use adapters::{MemoryStore, PostgrestStore};
pub use crate::core::{
    availability::filter_availability, booking::BookingWriter, flow::BookingFlow,
    operator::OperatorListing, scheduler::Scheduler, slots::generate_slots,
};
pub use utils::error::{BookingError, Result};
