use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Network(String),
    Api { status: u16, message: String },
    Deserialization(String),
    InvalidInput(String),
    NotFound(String),
    ConfigurationError(String),
    Internal(String),
}

impl AppError {
    /// スナップショットへ載せる表示用メッセージ。種別はログ側に残す。
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(_) => "Failed to load posts".to_string(),
            AppError::Api { status, .. } => format!("Server error (HTTP {})", status),
            AppError::Deserialization(_) => "Received an invalid server response".to_string(),
            other => other.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Network(_) => "NETWORK_ERROR",
            AppError::Api { .. } => "API_ERROR",
            AppError::Deserialization(_) => "DESERIALIZATION_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::Api { status, message } => {
                write!(f, "API error (status {}): {}", status, message)
            }
            AppError::Deserialization(msg) => write!(f, "Deserialization error: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Deserialization(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Deserialization(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Internal(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
