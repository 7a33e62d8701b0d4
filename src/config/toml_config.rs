use crate::domain::model::SlotWindow;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{BookingError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_BOOKING_HORIZON_DAYS: u32 = 14;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// 行程內儲存，附範例服務目錄
    #[default]
    Memory,
    /// PostgREST / Supabase REST 端點
    Postgrest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub operator_token: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub open_hour: Option<u32>,
    pub close_hour: Option<u32>,
    pub step_minutes: Option<u32>,
    pub booking_horizon_days: Option<u32>,
}

/// 未被替換的 `${VAR}` 視為未設定
fn resolved(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty() && !(v.starts_with("${") && v.ends_with('}')))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BookingError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BookingError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SUPABASE_ANON_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BookingError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if self.store.kind == StoreKind::Postgrest {
            let endpoint = resolved(&self.store.endpoint).ok_or_else(|| {
                BookingError::MissingConfigError {
                    field: "store.endpoint".to_string(),
                }
            })?;
            crate::utils::validation::validate_url("store.endpoint", endpoint)?;
        }

        crate::utils::validation::validate_positive_number(
            "store.timeout_seconds",
            self.timeout_seconds(),
            1,
        )?;
        crate::utils::validation::validate_positive_number(
            "schedule.booking_horizon_days",
            u64::from(self.booking_horizon_days()),
            1,
        )?;

        self.slot_window().validate()
    }
}

impl ConfigProvider for TomlConfig {
    fn store_endpoint(&self) -> &str {
        resolved(&self.store.endpoint).unwrap_or_default()
    }

    fn api_key(&self) -> Option<&str> {
        resolved(&self.store.api_key)
    }

    fn operator_token(&self) -> Option<&str> {
        resolved(&self.store.operator_token)
    }

    fn timeout_seconds(&self) -> u64 {
        self.store.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    fn slot_window(&self) -> SlotWindow {
        SlotWindow::new(
            self.schedule.open_hour.unwrap_or(SlotWindow::DEFAULT_OPEN_HOUR),
            self.schedule.close_hour.unwrap_or(SlotWindow::DEFAULT_CLOSE_HOUR),
            self.schedule
                .step_minutes
                .unwrap_or(SlotWindow::DEFAULT_STEP_MINUTES),
        )
    }

    fn booking_horizon_days(&self) -> u32 {
        self.schedule
            .booking_horizon_days
            .unwrap_or(DEFAULT_BOOKING_HORIZON_DAYS)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
