//! Trial configuration
//!
//! `TrialConfig` is the raw, serde-facing request. Most per-aperture fields
//! accept either a scalar (shared by every aperture) or an array with one
//! entry per aperture; `PerAperture::resolve` broadcasts them. `resolve()`
//! validates everything once and produces `ResolvedTrial`, which the engine
//! consumes. Nothing downstream re-validates.

use super::aperture::{Aperture, ApertureShape};
use super::response::{KeyList, ResponseKeys};
use super::types::Vec2;
use crate::error::ConfigError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Slack allowed when comparing coherence sums against 1.
pub const COHERENCE_EPSILON: f64 = 1e-9;

// ========== Parameter Broadcaster ==========

/// A value that is either shared by all apertures or given per aperture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PerAperture<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<T> for PerAperture<T> {
    fn from(value: T) -> Self {
        PerAperture::One(value)
    }
}

impl<T: Clone> PerAperture<T> {
    /// Broadcast to exactly `n` values.
    ///
    /// A scalar is repeated `n` times, a sequence must already have length `n`.
    /// Wrong-length sequences are rejected, never truncated or padded.
    pub fn resolve(&self, field: &'static str, n: usize) -> Result<Vec<T>, ConfigError> {
        match self {
            PerAperture::One(value) => Ok(vec![value.clone(); n]),
            PerAperture::Many(values) if values.len() == n => Ok(values.clone()),
            PerAperture::Many(values) => {
                Err(ConfigError::LengthMismatch { field, expected: n, found: values.len() })
            }
        }
    }
}

// ========== Policy tags ==========

/// Whether an object's coherent/noise role is fixed for the trial or re-drawn each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalSelection {
    #[default]
    Same,
    Different,
}

/// Motion rule for objects that do not carry the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoiseType {
    /// Teleport to a fresh uniform position every frame.
    RandomPosition,
    /// Fresh random heading every frame.
    RandomWalk,
    /// Fixed random heading chosen once per object.
    #[default]
    RandomDirection,
}

/// What happens when an object leaves its aperture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReinsertionPolicy {
    Random,
    #[default]
    OppositeEdge,
}

/// Which coherence axis carries the task (oriented objects).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskAxis {
    #[default]
    Movement,
    Orientation,
}

/// How the secondary axis assignment is linked to the primary axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CongruencyMode {
    #[default]
    Independent,
    Congruent,
    Incongruent,
}

/// Legacy numeric `rdk_type` codes 1..=6.
pub fn rdk_type_rule(code: u8) -> Option<(SignalSelection, NoiseType)> {
    let selection = match code {
        1..=3 => SignalSelection::Same,
        4..=6 => SignalSelection::Different,
        _ => return None,
    };
    let noise = match code % 3 {
        1 => NoiseType::RandomPosition,
        2 => NoiseType::RandomWalk,
        _ => NoiseType::RandomDirection,
    };
    Some((selection, noise))
}

// ========== Raw request ==========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OrientationConfig {
    pub orientation_coherence: PerAperture<f64>,
    pub opposite_orientation_coherence: PerAperture<f64>,
    /// Degrees, counter-clockwise from +x.
    pub coherent_orientation: PerAperture<f64>,
    /// Long-axis length of each oriented object in pixels.
    pub object_length: PerAperture<f64>,
    pub task_axis: TaskAxis,
    pub congruency: CongruencyMode,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            orientation_coherence: 0.5.into(),
            opposite_orientation_coherence: 0.0.into(),
            coherent_orientation: 0.0.into(),
            object_length: 10.0.into(),
            task_axis: TaskAxis::default(),
            congruency: CongruencyMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TrialConfig {
    pub number_of_apertures: usize,
    /// RNG seed; drawn from entropy when absent and echoed in the result.
    pub seed: Option<u64>,
    pub choices: ResponseKeys,
    pub correct_choice: KeyList,
    pub trial_duration_ms: Option<f64>,
    pub response_ends_trial: bool,
    pub record_frame_intervals: bool,
    pub background_color: String,
    /// Used to center apertures that have no explicit center.
    pub canvas_width: Option<f64>,
    pub canvas_height: Option<f64>,
    /// Shorthand for signal selection + noise type (1..=6).
    pub rdk_type: Option<u8>,

    pub number_of_dots: PerAperture<usize>,
    pub number_of_sets: PerAperture<usize>,
    /// Degrees, counter-clockwise from +x (0 = right, 90 = up).
    pub coherent_direction: PerAperture<f64>,
    pub coherence: PerAperture<f64>,
    pub opposite_coherence: PerAperture<f64>,
    /// Pixels per frame.
    pub move_distance: PerAperture<f64>,
    /// Half-width of the uniform per-object speed jitter, pixels per frame.
    pub speed_spread: PerAperture<f64>,
    pub dot_radius: PerAperture<f64>,
    /// Frames before a forced relocation; `null` = infinite.
    pub dot_life: PerAperture<Option<u32>>,
    pub dot_color: PerAperture<String>,
    pub aperture_type: PerAperture<ApertureShape>,
    pub aperture_width: PerAperture<f64>,
    pub aperture_height: PerAperture<f64>,
    pub aperture_center_x: Option<PerAperture<f64>>,
    pub aperture_center_y: Option<PerAperture<f64>>,
    pub signal_selection: PerAperture<SignalSelection>,
    pub noise_type: PerAperture<NoiseType>,
    pub reinsert_type: PerAperture<ReinsertionPolicy>,
    pub border: PerAperture<bool>,
    pub border_width: PerAperture<f64>,
    pub border_color: PerAperture<String>,
    pub fade_edges: PerAperture<bool>,
    /// Present for oriented-object stimuli.
    pub orientation: Option<OrientationConfig>,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            number_of_apertures: 1,
            seed: None,
            choices: ResponseKeys::default(),
            correct_choice: KeyList::default(),
            trial_duration_ms: Some(500.0),
            response_ends_trial: true,
            record_frame_intervals: false,
            background_color: "gray".to_string(),
            canvas_width: None,
            canvas_height: None,
            rdk_type: None,
            number_of_dots: 300.into(),
            number_of_sets: 1.into(),
            coherent_direction: 0.0.into(),
            coherence: 0.5.into(),
            opposite_coherence: 0.0.into(),
            move_distance: 1.0.into(),
            speed_spread: 0.0.into(),
            dot_radius: 2.0.into(),
            dot_life: PerAperture::One(None),
            dot_color: "white".to_string().into(),
            aperture_type: ApertureShape::Ellipse.into(),
            aperture_width: 600.0.into(),
            aperture_height: 400.0.into(),
            aperture_center_x: None,
            aperture_center_y: None,
            signal_selection: SignalSelection::Same.into(),
            noise_type: NoiseType::RandomDirection.into(),
            reinsert_type: ReinsertionPolicy::OppositeEdge.into(),
            border: false.into(),
            border_width: 1.0.into(),
            border_color: "black".to_string().into(),
            fade_edges: false.into(),
            orientation: None,
        }
    }
}

// ========== Resolved parameters ==========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BorderStyle {
    pub width: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectStyle {
    pub radius: f64,
    pub color: String,
    /// Long-axis length; only set for oriented objects.
    pub length: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OrientationParams {
    pub coherence: f64,
    pub opposite_coherence: f64,
    pub coherent_orientation_deg: f64,
    pub task_axis: TaskAxis,
    pub congruency: CongruencyMode,
}

/// Everything one aperture's update needs, passed explicitly into each frame step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ApertureParams {
    pub index: usize,
    pub aperture: Aperture,
    pub n_objects: usize,
    pub n_sets: usize,
    pub coherent_direction_deg: f64,
    pub coherence: f64,
    pub opposite_coherence: f64,
    pub speed: f64,
    pub speed_spread: f64,
    pub life_limit: Option<u32>,
    pub signal_selection: SignalSelection,
    pub noise_type: NoiseType,
    pub reinsertion: ReinsertionPolicy,
    pub fade_edges: bool,
    pub border: Option<BorderStyle>,
    pub style: ObjectStyle,
    pub orientation: Option<OrientationParams>,
}

impl ApertureParams {
    pub fn coherent_direction_rad(&self) -> f64 {
        self.coherent_direction_deg.to_radians()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrialTiming {
    pub trial_duration_ms: Option<f64>,
    pub response_ends_trial: bool,
    pub record_frame_intervals: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResolvedTrial {
    pub seed: u64,
    pub apertures: Vec<ApertureParams>,
    pub timing: TrialTiming,
    pub choices: ResponseKeys,
    pub correct_choice: Vec<String>,
    pub background_color: String,
}

impl TrialConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate and broadcast into per-aperture parameters.
    pub fn resolve(&self) -> Result<ResolvedTrial, ConfigError> {
        let n = self.number_of_apertures;
        if n == 0 {
            return Err(ConfigError::invalid("number_of_apertures", "must be at least 1"));
        }

        if let Some(duration) = self.trial_duration_ms {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(ConfigError::invalid("trial_duration_ms", "must be positive"));
            }
        }

        let legacy_rule = match self.rdk_type {
            Some(code) => Some(rdk_type_rule(code).ok_or_else(|| {
                ConfigError::invalid("rdk_type", format!("{code} is not in 1..=6"))
            })?),
            None => None,
        };

        let dots = self.number_of_dots.resolve("number_of_dots", n)?;
        let sets = self.number_of_sets.resolve("number_of_sets", n)?;
        let directions = self.coherent_direction.resolve("coherent_direction", n)?;
        let coherence = self.coherence.resolve("coherence", n)?;
        let opposite = self.opposite_coherence.resolve("opposite_coherence", n)?;
        let speeds = self.move_distance.resolve("move_distance", n)?;
        let spreads = self.speed_spread.resolve("speed_spread", n)?;
        let radii = self.dot_radius.resolve("dot_radius", n)?;
        let lives = self.dot_life.resolve("dot_life", n)?;
        let colors = self.dot_color.resolve("dot_color", n)?;
        let shapes = self.aperture_type.resolve("aperture_type", n)?;
        let widths = self.aperture_width.resolve("aperture_width", n)?;
        let heights = self.aperture_height.resolve("aperture_height", n)?;
        let centers_x = resolve_center(
            self.aperture_center_x.as_ref(),
            self.canvas_width,
            "aperture_center_x",
            n,
        )?;
        let centers_y = resolve_center(
            self.aperture_center_y.as_ref(),
            self.canvas_height,
            "aperture_center_y",
            n,
        )?;
        let selections = self.signal_selection.resolve("signal_selection", n)?;
        let noises = self.noise_type.resolve("noise_type", n)?;
        let reinserts = self.reinsert_type.resolve("reinsert_type", n)?;
        let borders = self.border.resolve("border", n)?;
        let border_widths = self.border_width.resolve("border_width", n)?;
        let border_colors = self.border_color.resolve("border_color", n)?;
        let fades = self.fade_edges.resolve("fade_edges", n)?;
        let orientation = self.orientation.as_ref().map(|o| o.resolve(n)).transpose()?;
        let lengths = self
            .orientation
            .as_ref()
            .map(|o| o.object_length.resolve("object_length", n))
            .transpose()?;

        let mut apertures = Vec::with_capacity(n);
        for i in 0..n {
            if sets[i] == 0 {
                return Err(ConfigError::invalid("number_of_sets", "must be at least 1"));
            }
            check_coherence_pair(i, coherence[i], opposite[i], "coherence", "opposite_coherence")?;
            check_non_negative("move_distance", speeds[i])?;
            check_non_negative("speed_spread", spreads[i])?;
            check_finite("speed_spread", speeds[i] + spreads[i])?;
            check_non_negative("dot_radius", radii[i])?;
            check_non_negative("border_width", border_widths[i])?;
            check_finite("coherent_direction", directions[i])?;
            check_finite("aperture_center_x", centers_x[i])?;
            check_finite("aperture_center_y", centers_y[i])?;
            check_positive("aperture_width", widths[i])?;
            if shapes[i].uses_height() {
                check_positive("aperture_height", heights[i])?;
            }
            if lives[i] == Some(0) {
                return Err(ConfigError::invalid("dot_life", "must be at least 1 frame or null"));
            }

            let (signal_selection, noise_type) =
                legacy_rule.unwrap_or((selections[i], noises[i]));
            let orientation_params = orientation.as_ref().map(|o| o[i]);
            if let Some(o) = &orientation_params {
                check_coherence_pair(
                    i,
                    o.coherence,
                    o.opposite_coherence,
                    "orientation_coherence",
                    "opposite_orientation_coherence",
                )?;
            }
            let length = lengths.as_ref().map(|l| l[i]);
            if let Some(length) = length {
                check_non_negative("object_length", length)?;
            }

            apertures.push(ApertureParams {
                index: i,
                aperture: Aperture::new(
                    shapes[i],
                    Vec2::new(centers_x[i], centers_y[i]),
                    widths[i],
                    heights[i],
                ),
                n_objects: dots[i],
                n_sets: sets[i],
                coherent_direction_deg: directions[i],
                coherence: coherence[i],
                opposite_coherence: opposite[i],
                speed: speeds[i],
                speed_spread: spreads[i],
                life_limit: lives[i],
                signal_selection,
                noise_type,
                reinsertion: reinserts[i],
                fade_edges: fades[i],
                border: borders[i].then(|| BorderStyle {
                    width: border_widths[i],
                    color: border_colors[i].clone(),
                }),
                style: ObjectStyle { radius: radii[i], color: colors[i].clone(), length },
                orientation: orientation_params,
            });
        }

        Ok(ResolvedTrial {
            seed: self.seed.unwrap_or_else(rand::random),
            apertures,
            timing: TrialTiming {
                trial_duration_ms: self.trial_duration_ms,
                response_ends_trial: self.response_ends_trial,
                record_frame_intervals: self.record_frame_intervals,
            },
            choices: self.choices.clone(),
            correct_choice: self.correct_choice.clone().into_vec(),
            background_color: self.background_color.clone(),
        })
    }
}

impl OrientationConfig {
    fn resolve(&self, n: usize) -> Result<Vec<OrientationParams>, ConfigError> {
        let coherence = self.orientation_coherence.resolve("orientation_coherence", n)?;
        let opposite =
            self.opposite_orientation_coherence.resolve("opposite_orientation_coherence", n)?;
        let angles = self.coherent_orientation.resolve("coherent_orientation", n)?;
        angles.iter().try_for_each(|a| check_finite("coherent_orientation", *a))?;
        Ok((0..n)
            .map(|i| OrientationParams {
                coherence: coherence[i],
                opposite_coherence: opposite[i],
                coherent_orientation_deg: angles[i],
                task_axis: self.task_axis,
                congruency: self.congruency,
            })
            .collect())
    }
}

/// Explicit centers win; otherwise fall back to the canvas midpoint.
fn resolve_center(
    explicit: Option<&PerAperture<f64>>,
    canvas_extent: Option<f64>,
    field: &'static str,
    n: usize,
) -> Result<Vec<f64>, ConfigError> {
    match (explicit, canvas_extent) {
        (Some(values), _) => values.resolve(field, n),
        (None, Some(extent)) => Ok(vec![extent / 2.0; n]),
        (None, None) => Err(ConfigError::MissingField(field)),
    }
}

fn check_coherence_pair(
    aperture: usize,
    coherence: f64,
    opposite: f64,
    field: &'static str,
    opposite_field: &'static str,
) -> Result<(), ConfigError> {
    for (name, value) in [(field, coherence), (opposite_field, opposite)] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::invalid(name, format!("{value} is outside [0, 1]")));
        }
    }
    let total = coherence + opposite;
    if total > 1.0 + COHERENCE_EPSILON {
        return Err(ConfigError::CoherenceOverflow { aperture, total });
    }
    Ok(())
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be finite"))
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::invalid(field, format!("{value} is negative")));
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    check_finite(field, value)?;
    if value <= 0.0 {
        return Err(ConfigError::invalid(field, format!("{value} must be positive")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn centered() -> TrialConfig {
        TrialConfig { canvas_width: Some(800.0), canvas_height: Some(600.0), ..Default::default() }
    }

    #[test]
    fn test_broadcast_scalar() {
        let value: PerAperture<f64> = serde_json::from_str("0.3").unwrap();
        assert_eq!(value.resolve("coherence", 3).unwrap(), vec![0.3, 0.3, 0.3]);
    }

    #[test]
    fn test_broadcast_sequence_unchanged() {
        let value: PerAperture<f64> = serde_json::from_str("[0.1, 0.9]").unwrap();
        assert_eq!(value.resolve("coherence", 2).unwrap(), vec![0.1, 0.9]);
    }

    #[test]
    fn test_broadcast_wrong_length_rejected() {
        let value: PerAperture<usize> = serde_json::from_str("[100, 200, 300]").unwrap();
        assert_eq!(
            value.resolve("number_of_dots", 2),
            Err(ConfigError::LengthMismatch { field: "number_of_dots", expected: 2, found: 3 })
        );
        let short: PerAperture<usize> = serde_json::from_str("[100]").unwrap();
        assert!(short.resolve("number_of_dots", 2).is_err());
    }

    #[test]
    fn test_dot_life_null_and_list() {
        let infinite: PerAperture<Option<u32>> = serde_json::from_str("null").unwrap();
        assert_eq!(infinite.resolve("dot_life", 2).unwrap(), vec![None, None]);
        let mixed: PerAperture<Option<u32>> = serde_json::from_str("[null, 20]").unwrap();
        assert_eq!(mixed.resolve("dot_life", 2).unwrap(), vec![None, Some(20)]);
    }

    #[test]
    fn test_defaults_resolve() {
        let resolved = centered().resolve().unwrap();
        assert_eq!(resolved.apertures.len(), 1);
        let ap = &resolved.apertures[0];
        assert_eq!(ap.n_objects, 300);
        assert_eq!(ap.aperture.center, Vec2::new(400.0, 300.0));
        assert_eq!(ap.aperture.shape, ApertureShape::Ellipse);
        assert_eq!(ap.aperture.width(), 600.0);
        assert_eq!(ap.aperture.height(), 400.0);
        assert_eq!(ap.signal_selection, SignalSelection::Same);
        assert_eq!(ap.noise_type, NoiseType::RandomDirection);
        assert_eq!(ap.reinsertion, ReinsertionPolicy::OppositeEdge);
        assert_eq!(ap.life_limit, None);
        assert!(ap.border.is_none());
    }

    #[test]
    fn test_missing_center_is_reported() {
        let err = TrialConfig::default().resolve().unwrap_err();
        assert_eq!(err, ConfigError::MissingField("aperture_center_x"));
    }

    #[test]
    fn test_two_apertures_from_json() {
        let config = TrialConfig::from_json(
            r#"{
                "number_of_apertures": 2,
                "seed": 11,
                "aperture_center_x": [200, 600],
                "aperture_center_y": 300,
                "coherence": [0.2, 0.8],
                "aperture_type": ["circle", "rectangle"],
                "border": [true, false]
            }"#,
        )
        .unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.seed, 11);
        assert_eq!(resolved.apertures[0].aperture.center, Vec2::new(200.0, 300.0));
        assert_eq!(resolved.apertures[1].aperture.center, Vec2::new(600.0, 300.0));
        assert_eq!(resolved.apertures[1].aperture.shape, ApertureShape::Rectangle);
        assert_eq!(resolved.apertures[1].coherence, 0.8);
        assert!(resolved.apertures[0].border.is_some());
        assert!(resolved.apertures[1].border.is_none());
    }

    #[test]
    fn test_length_mismatch_fails_resolution() {
        let config = TrialConfig {
            number_of_apertures: 2,
            coherence: PerAperture::Many(vec![0.1, 0.2, 0.3]),
            ..centered()
        };
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::LengthMismatch { field: "coherence", expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_coherence_overflow_rejected() {
        let config = TrialConfig {
            coherence: 0.7.into(),
            opposite_coherence: 0.4.into(),
            ..centered()
        };
        assert!(matches!(config.resolve(), Err(ConfigError::CoherenceOverflow { .. })));
    }

    #[test]
    fn test_coherence_out_of_range_rejected() {
        let config = TrialConfig { coherence: 1.5.into(), ..centered() };
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidValue { field: "coherence", .. })
        ));
    }

    #[test]
    fn test_degenerate_aperture_rejected() {
        let config = TrialConfig { aperture_width: 0.0.into(), ..centered() };
        assert!(config.resolve().is_err());

        // Height is ignored for circles, so a zero height is harmless there.
        let circle = TrialConfig {
            aperture_height: 0.0.into(),
            aperture_type: ApertureShape::Circle.into(),
            ..centered()
        };
        assert!(circle.resolve().is_ok());
        let ellipse = TrialConfig { aperture_height: 0.0.into(), ..centered() };
        assert!(ellipse.resolve().is_err());
    }

    #[test]
    fn test_speed_spread_must_keep_speed_finite() {
        let wide = TrialConfig { speed_spread: 1.0e308.into(), ..centered() };
        assert!(wide.resolve().is_ok());
        let overflowing = TrialConfig {
            move_distance: 1.0e308.into(),
            speed_spread: 1.0e308.into(),
            ..centered()
        };
        let err = overflowing.resolve().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "speed_spread", .. }));
    }

    #[test]
    fn test_zero_life_rejected() {
        let config = TrialConfig { dot_life: PerAperture::One(Some(0)), ..centered() };
        assert!(config.resolve().is_err());
    }

    #[test]
    fn test_rdk_type_overrides_rules() {
        let config = TrialConfig {
            rdk_type: Some(5),
            signal_selection: SignalSelection::Same.into(),
            noise_type: NoiseType::RandomDirection.into(),
            ..centered()
        };
        let ap = &config.resolve().unwrap().apertures[0];
        assert_eq!(ap.signal_selection, SignalSelection::Different);
        assert_eq!(ap.noise_type, NoiseType::RandomWalk);

        let bad = TrialConfig { rdk_type: Some(7), ..centered() };
        assert!(bad.resolve().is_err());
    }

    #[test]
    fn test_rdk_type_table() {
        use NoiseType::*;
        use SignalSelection::*;
        assert_eq!(rdk_type_rule(1), Some((Same, RandomPosition)));
        assert_eq!(rdk_type_rule(2), Some((Same, RandomWalk)));
        assert_eq!(rdk_type_rule(3), Some((Same, RandomDirection)));
        assert_eq!(rdk_type_rule(4), Some((Different, RandomPosition)));
        assert_eq!(rdk_type_rule(5), Some((Different, RandomWalk)));
        assert_eq!(rdk_type_rule(6), Some((Different, RandomDirection)));
        assert_eq!(rdk_type_rule(0), None);
    }

    #[test]
    fn test_orientation_block() {
        let config = TrialConfig::from_json(
            r#"{
                "canvas_width": 800, "canvas_height": 600,
                "orientation": {
                    "orientation_coherence": 0.6,
                    "coherent_orientation": 45,
                    "congruency": "incongruent",
                    "task_axis": "orientation"
                }
            }"#,
        )
        .unwrap();
        let ap = &config.resolve().unwrap().apertures[0];
        let o = ap.orientation.unwrap();
        assert_eq!(o.coherence, 0.6);
        assert_eq!(o.coherent_orientation_deg, 45.0);
        assert_eq!(o.congruency, CongruencyMode::Incongruent);
        assert_eq!(o.task_axis, TaskAxis::Orientation);
        assert_eq!(ap.style.length, Some(10.0));
    }

    proptest! {
        #[test]
        fn prop_scalar_broadcast_has_requested_length(value in any::<f64>(), n in 0usize..16) {
            let resolved = PerAperture::One(value).resolve("x", n).unwrap();
            prop_assert_eq!(resolved.len(), n);
        }

        #[test]
        fn prop_sequence_length_must_match(len in 0usize..8, n in 0usize..8) {
            let result = PerAperture::Many(vec![1u32; len]).resolve("x", n);
            prop_assert_eq!(result.is_ok(), len == n);
        }
    }
}
