//! Render-ready frame data
//!
//! The engine never draws. Each frame it hands a complete `FrameSnapshot` to a
//! `Renderer`; the renderer owns the canvas, colors and clearing.

use crate::models::aperture::Aperture;
use crate::models::config::{BorderStyle, ObjectStyle};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObjectSnapshot {
    pub x: f64,
    pub y: f64,
    /// Radians, oriented objects only.
    pub orientation: Option<f64>,
    /// 1.0 unless edge fading is enabled.
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApertureSnapshot {
    pub aperture: Aperture,
    pub border: Option<BorderStyle>,
    pub style: ObjectStyle,
    pub objects: Vec<ObjectSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub frame_index: u64,
    pub background_color: String,
    pub apertures: Vec<ApertureSnapshot>,
}

impl FrameSnapshot {
    pub fn object_count(&self) -> usize {
        self.apertures.iter().map(|a| a.objects.len()).sum()
    }
}

/// Draw target for one frame.
pub trait Renderer {
    fn render(&mut self, frame: &FrameSnapshot);
}

impl<F: FnMut(&FrameSnapshot)> Renderer for F {
    fn render(&mut self, frame: &FrameSnapshot) {
        self(frame)
    }
}

/// Discards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _frame: &FrameSnapshot) {}
}

/// Keeps every frame it is given (offline export, tests).
#[derive(Debug, Default, Clone)]
pub struct FrameRecorder {
    frames: Vec<FrameSnapshot>,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[FrameSnapshot] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<FrameSnapshot> {
        self.frames
    }
}

impl Renderer for FrameRecorder {
    fn render(&mut self, frame: &FrameSnapshot) {
        self.frames.push(frame.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u64) -> FrameSnapshot {
        FrameSnapshot { frame_index: index, background_color: "gray".into(), apertures: vec![] }
    }

    #[test]
    fn test_recorder_keeps_frames_in_order() {
        let mut recorder = FrameRecorder::new();
        recorder.render(&frame(0));
        recorder.render(&frame(1));
        let indices: Vec<_> = recorder.frames().iter().map(|f| f.frame_index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_closure_renderer() {
        let mut seen = 0;
        {
            let mut count = |_: &FrameSnapshot| seen += 1;
            count.render(&frame(3));
            count.render(&frame(4));
        }
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_snapshot_serializes_flat_objects() {
        let snap = ObjectSnapshot { x: 1.5, y: -2.0, orientation: None, alpha: 1.0 };
        let json = serde_json::to_value(snap).unwrap();
        assert_eq!(json["x"], 1.5);
        assert!(json["orientation"].is_null());
    }
}
