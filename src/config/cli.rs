use crate::config::toml_config::{StoreKind, TomlConfig};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};
use chrono::{NaiveDate, NaiveTime};

#[derive(Debug, Clone, Parser)]
#[command(name = "slot-booking")]
#[command(about = "Browse services, check free slots and book appointments")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the store kind from the config file
    #[arg(long, value_enum)]
    pub store: Option<StoreKind>,

    /// Override the store endpoint from the config file
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Override the request timeout (seconds)
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List bookable services
    Services,
    /// List the days open for booking, starting today
    Days,
    /// Show free and taken slots for a service on a day
    Slots {
        #[arg(long)]
        service: String,
        /// Day to check (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },
    /// Book a slot
    Book {
        #[arg(long)]
        service: String,
        /// Day of the appointment (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Slot start (HH:MM, 24h)
        #[arg(long)]
        time: NaiveTime,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Operator view: every appointment in start order
    Appointments,
}

impl CliConfig {
    /// 載入設定檔 (未指定時使用預設值)，套用命令列覆蓋後驗證
    pub fn load_config(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };

        if let Some(kind) = self.store {
            config.store.kind = kind;
            tracing::info!("🔧 Store overridden to: {:?}", kind);
        }
        if let Some(endpoint) = &self.endpoint {
            config.store.endpoint = Some(endpoint.clone());
        }
        if let Some(timeout) = self.timeout_seconds {
            config.store.timeout_seconds = Some(timeout);
        }

        config.validate()?;
        Ok(config)
    }
}
