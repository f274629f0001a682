//! Simulation engine
//!
//! - `population`: coherence split and initial object state
//! - `motion`: per-frame step, lifetime expiry, reinsertion
//! - `stimulus`: all apertures of one trial, set cycling, snapshots
//! - `snapshot`: render-ready frame data and the `Renderer` seam
//! - `scheduler`: frame loop, response capture, trial termination
//! - `headless`: virtual clock host for offline runs and tests

pub mod headless;
pub mod motion;
pub mod population;
pub mod scheduler;
pub mod snapshot;
pub mod stimulus;

pub use headless::{run_headless, HeadlessOptions, ScriptedKey, VirtualHost};
pub use motion::{reinsert, step_object, update_population, vertical_edge_probability};
pub use population::{build_population, CoherenceSplit, Population};
pub use scheduler::{
    FrameHost, FrameRequestId, FrameScheduler, SchedulerState, TimerId, TrialResult,
};
pub use snapshot::{
    ApertureSnapshot, FrameRecorder, FrameSnapshot, NullRenderer, ObjectSnapshot, Renderer,
};
pub use stimulus::{ApertureField, Stimulus};
