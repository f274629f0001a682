//! Aperture geometry
//!
//! An aperture is the bounded region the objects of one population live in.
//! Round shapes (circle, ellipse) are tested with the normalized squared
//! distance from the center, box shapes (square, rectangle) with an
//! axis-aligned box test.
//!
//! ## Axes
//! - Circle / Square: both half-axes = width / 2 (height is ignored)
//! - Ellipse / Rectangle: horizontal = width / 2, vertical = height / 2

use super::types::Vec2;
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Absorbs rounding when a sampled point lands exactly on the boundary.
const BOUNDS_EPSILON: f64 = 1e-9;

/// Fraction of the normalized radius covered by the edge-fade ramp (round shapes).
const ROUND_FADE_BAND: f64 = 0.3;

/// Box shapes fade over `width / BOX_FADE_DIVISOR` pixels.
const BOX_FADE_DIVISOR: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApertureShape {
    Circle,
    #[default]
    Ellipse,
    Square,
    Rectangle,
}

impl ApertureShape {
    /// Circle and ellipse share the polar sampler and the point-reflection rule.
    pub fn is_round(self) -> bool {
        matches!(self, ApertureShape::Circle | ApertureShape::Ellipse)
    }

    /// Shapes whose vertical axis follows the configured height.
    pub fn uses_height(self) -> bool {
        matches!(self, ApertureShape::Ellipse | ApertureShape::Rectangle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Aperture {
    pub shape: ApertureShape,
    pub center: Vec2,
    pub horizontal_axis: f64,
    pub vertical_axis: f64,
}

impl Aperture {
    pub fn new(shape: ApertureShape, center: Vec2, width: f64, height: f64) -> Self {
        let horizontal_axis = width / 2.0;
        let vertical_axis = if shape.uses_height() { height / 2.0 } else { horizontal_axis };
        Self { shape, center, horizontal_axis, vertical_axis }
    }

    /// (horizontal, vertical) half-axes.
    pub fn axes(&self) -> (f64, f64) {
        (self.horizontal_axis, self.vertical_axis)
    }

    pub fn width(&self) -> f64 {
        self.horizontal_axis * 2.0
    }

    pub fn height(&self) -> f64 {
        self.vertical_axis * 2.0
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let d = point - self.center;
        if self.shape.is_round() {
            self.normalized_radius_sq(d) <= 1.0 + BOUNDS_EPSILON
        } else {
            d.x.abs() <= self.horizontal_axis + BOUNDS_EPSILON
                && d.y.abs() <= self.vertical_axis + BOUNDS_EPSILON
        }
    }

    /// Uniform point inside the aperture.
    ///
    /// Round shapes use the polar method (sqrt of the radius factor keeps the
    /// density uniform over area); box shapes draw each coordinate independently.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        if self.shape.is_round() {
            let phi = rng.gen_range(-PI..=PI);
            let rho = rng.gen::<f64>().sqrt();
            Vec2::new(
                self.center.x + rho * phi.cos() * self.horizontal_axis,
                self.center.y + rho * phi.sin() * self.vertical_axis,
            )
        } else {
            Vec2::new(
                self.center.x + rng.gen_range(-1.0..=1.0) * self.horizontal_axis,
                self.center.y + rng.gen_range(-1.0..=1.0) * self.vertical_axis,
            )
        }
    }

    /// Point symmetry through the center: `center - (p - center)`.
    pub fn reflect_through_center(&self, point: Vec2) -> Vec2 {
        self.center - (point - self.center)
    }

    /// Opacity for edge fading: 1 inside, linear ramp to 0 across the outer band.
    pub fn edge_alpha(&self, point: Vec2) -> f64 {
        let d = point - self.center;
        if self.shape.is_round() {
            let r = self.normalized_radius_sq(d).sqrt();
            ((1.0 - r) / ROUND_FADE_BAND).clamp(0.0, 1.0)
        } else {
            let band = self.width() / BOX_FADE_DIVISOR;
            let inset = (self.horizontal_axis - d.x.abs()).min(self.vertical_axis - d.y.abs());
            (inset / band).clamp(0.0, 1.0)
        }
    }

    fn normalized_radius_sq(&self, d: Vec2) -> f64 {
        let nx = d.x / self.horizontal_axis;
        let ny = d.y / self.vertical_axis;
        nx * nx + ny * ny
    }
}
