pub mod envelope;
pub mod trial_json;

pub use envelope::{ApiError, ApiResponse, API_VERSION};
pub use trial_json::{
    run_trial, run_trial_json, trial_config_schema, trial_request_schema, validate_config_json,
    TrialOutput, TrialRequest,
};
