use chrono::NaiveDateTime;
use std::fmt;
use thiserror::Error;

/// 儲存層失敗的種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceKind {
    /// 唯一性衝突 (同一開始時間已有預約)
    Conflict,
    Timeout,
    Network,
    Unauthorized,
    MalformedResponse,
    /// 其他非 2xx 回應
    Rejected,
}

impl fmt::Display for PersistenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PersistenceKind::Conflict => "conflict",
            PersistenceKind::Timeout => "timeout",
            PersistenceKind::Network => "network",
            PersistenceKind::Unauthorized => "unauthorized",
            PersistenceKind::MalformedResponse => "malformed response",
            PersistenceKind::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Store request failed ({kind}): {message}")]
    Persistence {
        kind: PersistenceKind,
        message: String,
    },

    #[error("Slot at {start} is no longer available")]
    StaleAvailability { start: NaiveDateTime },

    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: String, action: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Store,
    Availability,
    Flow,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BookingError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        BookingError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn persistence(kind: PersistenceKind, message: impl Into<String>) -> Self {
        BookingError::Persistence {
            kind,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BookingError::Validation { .. } => ErrorCategory::Input,
            BookingError::Persistence { .. } => ErrorCategory::Store,
            BookingError::StaleAvailability { .. } => ErrorCategory::Availability,
            BookingError::InvalidTransition { .. } => ErrorCategory::Flow,
            BookingError::ConfigValidationError { .. }
            | BookingError::InvalidConfigValueError { .. }
            | BookingError::MissingConfigError { .. } => ErrorCategory::Configuration,
            BookingError::IoError(_) | BookingError::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    /// 嚴重程度；預約流程中的錯誤都可由使用者修正，不會終止程式
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BookingError::Validation { .. } | BookingError::InvalidTransition { .. } => {
                ErrorSeverity::Low
            }
            BookingError::StaleAvailability { .. } => ErrorSeverity::Medium,
            BookingError::Persistence { kind, .. } => match kind {
                PersistenceKind::Conflict => ErrorSeverity::Medium,
                PersistenceKind::Timeout | PersistenceKind::Network => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
            BookingError::ConfigValidationError { .. }
            | BookingError::InvalidConfigValueError { .. }
            | BookingError::MissingConfigError { .. } => ErrorSeverity::High,
            BookingError::IoError(_) | BookingError::SerializationError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    /// 時段已被他人預約 (唯一性衝突或新鮮度檢查失敗)
    pub fn is_slot_taken(&self) -> bool {
        matches!(
            self,
            BookingError::StaleAvailability { .. }
                | BookingError::Persistence {
                    kind: PersistenceKind::Conflict,
                    ..
                }
        )
    }

    pub fn user_friendly_message(&self) -> String {
        if self.is_slot_taken() {
            return "That time slot was just taken, please pick another.".to_string();
        }

        match self {
            BookingError::Validation { field, message } => {
                format!("Please check {}: {}", field, message)
            }
            BookingError::Persistence { kind, message } => match kind {
                PersistenceKind::Timeout => "The booking service did not respond in time.".to_string(),
                PersistenceKind::Network => "Could not reach the booking service.".to_string(),
                PersistenceKind::Unauthorized => "Access to the appointment list was denied.".to_string(),
                _ => format!("Booking failed: {}", message),
            },
            BookingError::InvalidTransition { action, .. } => {
                format!("You cannot {} right now.", action)
            }
            BookingError::ConfigValidationError { .. }
            | BookingError::InvalidConfigValueError { .. }
            | BookingError::MissingConfigError { .. } => format!("Configuration problem: {}", self),
            _ => format!("Unexpected error: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        if self.is_slot_taken() {
            return "Refresh the availability for that day and choose a free slot";
        }

        match self {
            BookingError::Validation { .. } => "Fill in every booking field and submit again",
            BookingError::Persistence { kind, .. } => match kind {
                PersistenceKind::Timeout | PersistenceKind::Network => {
                    "Check the store endpoint and your connection, then retry"
                }
                PersistenceKind::Unauthorized => "Check the configured operator token",
                _ => "Retry the request or pick a different slot",
            },
            BookingError::InvalidTransition { .. } => "Complete the current step first",
            BookingError::ConfigValidationError { .. }
            | BookingError::InvalidConfigValueError { .. }
            | BookingError::MissingConfigError { .. } => "Fix the configuration file and try again",
            _ => "Check the logs for details",
        }
    }
}

impl From<reqwest::Error> for BookingError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            PersistenceKind::Timeout
        } else if err.is_connect() || err.is_request() {
            PersistenceKind::Network
        } else if err.is_decode() {
            PersistenceKind::MalformedResponse
        } else {
            PersistenceKind::Rejected
        };
        BookingError::persistence(kind, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
