use thiserror::Error;

/// 訊息投遞層級的失敗，與 Document 內的業務錯誤分開
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportFault {
    #[error("No reply from '{address}' within {timeout_ms}ms")]
    Timeout { address: String, timeout_ms: u64 },

    #[error("No handlers registered for address '{address}'")]
    NoHandlers { address: String },

    #[error("Codec error: {message}")]
    Codec { message: String },

    #[error("Recipient at '{address}' failed the message: {message}")]
    Recipient { address: String, message: String },

    #[error("Reply channel for '{address}' closed before a reply was sent")]
    ChannelClosed { address: String },
}

#[derive(Error, Debug)]
pub enum KnotError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Transport fault: {0}")]
    Transport(#[from] TransportFault),

    #[error("Processing error in {knot}: {message}")]
    ProcessingError { knot: String, message: String },

    #[error("Service {uri} failed: {reason}")]
    ServiceError { uri: String, reason: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Transport,
    Processing,
    Service,
    Io,
}

impl KnotError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn processing(knot: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessingError {
            knot: knot.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::Transport(_) => ErrorCategory::Transport,
            Self::ProcessingError { .. } | Self::SerializationError(_) => {
                ErrorCategory::Processing
            }
            Self::ServiceError { .. } | Self::HttpError(_) => ErrorCategory::Service,
            Self::IoError(_) => ErrorCategory::Io,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// 給 CLI 使用者的處理建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => {
                "Check the knot configuration file and fix the reported field"
            }
            Self::Transport(TransportFault::NoHandlers { .. }) => {
                "Make sure a knot is deployed on the address used in the chain"
            }
            Self::Transport(TransportFault::Timeout { .. }) => {
                "Increase the request timeout or check the slow knot's external services"
            }
            Self::Transport(_) => "Check that every knot speaks the same document format",
            Self::ProcessingError { .. } | Self::SerializationError(_) => {
                "Inspect the knot logs for the failing document"
            }
            Self::ServiceError { .. } | Self::HttpError(_) => {
                "Verify the external service is reachable from this host"
            }
            Self::IoError(_) => "Check file paths and permissions",
        }
    }
}

pub type Result<T> = std::result::Result<T, KnotError>;
