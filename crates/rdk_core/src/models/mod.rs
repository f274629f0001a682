pub mod aperture;
pub mod config;
pub mod object;
pub mod response;
pub mod types;

pub use aperture::{Aperture, ApertureShape};
pub use config::{
    ApertureParams, BorderStyle, CongruencyMode, NoiseType, ObjectStyle, OrientationConfig,
    OrientationParams, PerAperture, ReinsertionPolicy, ResolvedTrial, SignalSelection, TaskAxis,
    TrialConfig, TrialTiming,
};
pub use object::{MixtureWeights, MotionPolicy, OrientationPolicy, TrackedObject};
pub use response::{is_correct, KeyList, KeyPreset, ResponseKeys, TrialResponse};
pub use types::Vec2;
