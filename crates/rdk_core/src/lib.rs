//! # rdk_core - Seeded Kinematogram Motion Engine
//!
//! Simulates random-dot and random-object kinematograms: populations of
//! objects moving inside one or more apertures, a configurable fraction of
//! them coherently, the rest following a noise rule.
//!
//! ## Features
//! - Same seed = same trial (ChaCha8 RNG)
//! - Circle, ellipse, square and rectangle apertures
//! - Fixed ("same") or per-frame ("different") signal selection
//! - Oriented objects with a second coherence axis and congruency coupling
//! - Host-agnostic frame scheduler plus a virtual-clock headless driver
//! - JSON API for offline runs and integration

// Struct initialization pattern used intentionally
#![allow(clippy::field_reassign_with_default)]
// Complex types are sometimes necessary for generic APIs
#![allow(clippy::type_complexity)]

pub mod api;
pub mod engine;
pub mod error;
pub mod models;

// Re-export main API functions
pub use api::{
    run_trial, run_trial_json, trial_config_schema, trial_request_schema, validate_config_json,
    ApiError, ApiResponse, TrialOutput, TrialRequest,
};
pub use error::{ConfigError, RdkError, Result, SchedulerError};

// Re-export engine types
pub use engine::{
    run_headless, FrameHost, FrameRecorder, FrameScheduler, FrameSnapshot, HeadlessOptions,
    NullRenderer, Renderer, ScriptedKey, Stimulus, TrialResult,
};
pub use models::{ResolvedTrial, TrialConfig, TrialResponse};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
