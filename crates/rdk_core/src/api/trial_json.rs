//! JSON API for running and validating trials
//!
//! Every entry point takes a JSON string and returns a JSON string holding an
//! `ApiResponse`. Failures come back as error envelopes; nothing panics.

use super::envelope::{ApiError, ApiResponse};
use crate::engine::headless::{
    run_headless, HeadlessOptions, ScriptedKey, DEFAULT_MAX_DURATION_MS, DEFAULT_REFRESH_HZ,
};
use crate::engine::scheduler::TrialResult;
use crate::engine::snapshot::{FrameRecorder, FrameSnapshot, NullRenderer};
use crate::error::{ConfigError, RdkError, Result};
use crate::models::config::{ResolvedTrial, TrialConfig};
use schemars::schema::RootSchema;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// One headless trial run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TrialRequest {
    pub config: TrialConfig,
    /// Scripted key presses, milliseconds after start.
    #[serde(default)]
    pub responses: Vec<ScriptedKey>,
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: f64,
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: f64,
    /// Return every rendered frame alongside the result.
    #[serde(default)]
    pub include_frames: bool,
}

fn default_refresh_hz() -> f64 {
    DEFAULT_REFRESH_HZ
}

fn default_max_duration_ms() -> f64 {
    DEFAULT_MAX_DURATION_MS
}

impl TrialRequest {
    pub fn new(config: TrialConfig) -> Self {
        Self {
            config,
            responses: Vec::new(),
            refresh_hz: DEFAULT_REFRESH_HZ,
            max_duration_ms: DEFAULT_MAX_DURATION_MS,
            include_frames: false,
        }
    }

    fn options(&self) -> HeadlessOptions {
        HeadlessOptions { refresh_hz: self.refresh_hz, max_duration_ms: self.max_duration_ms }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialOutput {
    pub result: TrialResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<FrameSnapshot>>,
}

/// Resolve the configuration and run the trial on the virtual clock.
pub fn run_trial(request: &TrialRequest) -> Result<TrialOutput> {
    let trial = request.config.resolve()?;
    let options = request.options();
    if request.include_frames {
        let (result, recorder) =
            run_headless(trial, FrameRecorder::new(), &request.responses, &options)?;
        Ok(TrialOutput { result, frames: Some(recorder.into_frames()) })
    } else {
        let (result, _) = run_headless(trial, NullRenderer, &request.responses, &options)?;
        Ok(TrialOutput { result, frames: None })
    }
}

/// Run a trial from a JSON `TrialRequest`.
///
/// # Returns
/// JSON string containing `ApiResponse<TrialOutput>`
pub fn run_trial_json(request_json: &str) -> String {
    info!("Processing trial request");

    let request: TrialRequest = match serde_json::from_str(request_json) {
        Ok(req) => req,
        Err(e) => {
            error!("Failed to parse TrialRequest: {}", e);
            let err = RdkError::from(ConfigError::from(e));
            return ApiResponse::<TrialOutput>::error(ApiError::from(&err)).to_json();
        }
    };

    match run_trial(&request) {
        Ok(output) => {
            info!(
                seed = output.result.config.seed,
                frames = output.result.frame_count,
                correct = output.result.correct,
                "Trial completed"
            );
            ApiResponse::success(output).to_json()
        }
        Err(err) => {
            warn!("Trial request rejected: {}", err);
            ApiResponse::<TrialOutput>::error(ApiError::from(&err)).to_json()
        }
    }
}

/// Validate a bare `TrialConfig` and return its resolved per-aperture form.
///
/// # Returns
/// JSON string containing `ApiResponse<ResolvedTrial>`
pub fn validate_config_json(config_json: &str) -> String {
    let resolved = TrialConfig::from_json(config_json).and_then(|config| config.resolve());
    match resolved {
        Ok(trial) => ApiResponse::success(trial).to_json(),
        Err(e) => {
            warn!("Configuration rejected: {}", e);
            ApiResponse::<ResolvedTrial>::error(ApiError::from(&RdkError::from(e))).to_json()
        }
    }
}

pub fn trial_config_schema() -> RootSchema {
    schema_for!(TrialConfig)
}

pub fn trial_request_schema() -> RootSchema {
    schema_for!(TrialRequest)
}
