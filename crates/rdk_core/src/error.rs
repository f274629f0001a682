use thiserror::Error;

/// Setup-time configuration failures. Fatal to the trial, never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field}: expected {expected} per-aperture values, found {found}")]
    LengthMismatch { field: &'static str, expected: usize, found: usize },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Coherence fractions for aperture {aperture} sum to {total} (must be <= 1)")]
    CoherenceOverflow { aperture: usize, total: f64 },

    #[error("Invalid configuration JSON: {0}")]
    Json(String),
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue { field, reason: reason.into() }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Frame loop already started")]
    AlreadyStarted,

    #[error("Frame loop is not running")]
    NotRunning,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RdkError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl RdkError {
    /// Stable error code used by the JSON envelope.
    pub fn code(&self) -> &'static str {
        match self {
            RdkError::Config(ConfigError::Json(_)) => "INVALID_JSON",
            RdkError::Config(_) => "INVALID_CONFIG",
            RdkError::Scheduler(_) => "SCHEDULER",
        }
    }
}

pub type Result<T> = std::result::Result<T, RdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_message() {
        let err = ConfigError::LengthMismatch { field: "coherence", expected: 2, found: 3 };
        assert_eq!(err.to_string(), "coherence: expected 2 per-aperture values, found 3");
    }

    #[test]
    fn test_error_codes() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert_eq!(RdkError::from(ConfigError::from(json_err)).code(), "INVALID_JSON");
        assert_eq!(RdkError::from(ConfigError::MissingField("seed")).code(), "INVALID_CONFIG");
        assert_eq!(RdkError::from(SchedulerError::AlreadyStarted).code(), "SCHEDULER");
    }
}
