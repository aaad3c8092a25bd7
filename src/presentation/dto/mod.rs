pub mod feed_dto;

pub use feed_dto::{
    CatalogDto, FeedQueryRequest, FeedSnapshot, FilterStateDto, PostDto, SharePayloadDto,
};

use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// ホスト側へ返す共通レスポンス形式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
        }
    }

    pub fn error(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            error_code: Some(code.into()),
        }
    }

    pub fn from_app_error(err: &AppError) -> Self {
        Self::error(err.user_message(), err.code())
    }

    pub fn from_result(result: Result<T, AppError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => Self::from_app_error(&err),
        }
    }
}

/// リクエストDTOの入力検証
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}
