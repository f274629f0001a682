//! Response envelope shared by every JSON entry point.

use crate::error::{ConfigError, RdkError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// API version for schema compatibility
pub const API_VERSION: &str = "v1";

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub schema_version: String,
    pub timestamp: DateTime<Utc>,
}

/// Structured API error with codes and details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub details: Option<HashMap<String, serde_json::Value>>,
}

impl ApiError {
    pub fn new(code: &str, message: &str) -> Self {
        Self { code: code.to_string(), message: message.to_string(), details: None }
    }

    pub fn with_details(
        code: &str,
        message: &str,
        details: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self { code: code.to_string(), message: message.to_string(), details: Some(details) }
    }
}

impl From<&RdkError> for ApiError {
    fn from(error: &RdkError) -> Self {
        let mut details = HashMap::new();
        match error {
            RdkError::Config(ConfigError::LengthMismatch { field, expected, found }) => {
                details.insert("field".to_string(), (*field).into());
                details.insert("expected".to_string(), (*expected).into());
                details.insert("found".to_string(), (*found).into());
            }
            RdkError::Config(ConfigError::MissingField(field))
            | RdkError::Config(ConfigError::InvalidValue { field, .. }) => {
                details.insert("field".to_string(), (*field).into());
            }
            RdkError::Config(ConfigError::CoherenceOverflow { aperture, total }) => {
                details.insert("aperture".to_string(), (*aperture).into());
                details.insert("total".to_string(), (*total).into());
            }
            RdkError::Config(ConfigError::Json(_)) | RdkError::Scheduler(_) => {}
        }

        if details.is_empty() {
            Self::new(error.code(), &error.to_string())
        } else {
            Self::with_details(error.code(), &error.to_string(), details)
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            schema_version: API_VERSION.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn error(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            schema_version: API_VERSION.to_string(),
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Serialize for the wire; never fails outward.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
