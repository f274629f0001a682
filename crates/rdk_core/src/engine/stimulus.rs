//! Whole-trial stimulus
//!
//! Owns every aperture field plus the trial RNG. One `advance_frame` call
//! updates the current set of every aperture before anything is shown, then
//! rotates each aperture to its next set.

use super::motion::update_population;
use super::population::{build_population, Population};
use super::snapshot::{ApertureSnapshot, FrameSnapshot, ObjectSnapshot};
use crate::models::config::{ApertureParams, ResolvedTrial};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// One aperture: its parameters and the sets shown in rotation.
#[derive(Debug, Clone)]
pub struct ApertureField {
    pub params: ApertureParams,
    pub sets: Vec<Population>,
    next_set: usize,
    shown_set: usize,
}

impl ApertureField {
    fn new(params: ApertureParams, rng: &mut ChaCha8Rng) -> Self {
        let sets = (0..params.n_sets.max(1)).map(|_| build_population(&params, rng)).collect();
        Self { params, sets, next_set: 0, shown_set: 0 }
    }

    /// Set drawn in the most recent frame.
    pub fn shown(&self) -> &Population {
        &self.sets[self.shown_set]
    }

    pub fn shown_set_index(&self) -> usize {
        self.shown_set
    }

    fn advance(&mut self, rng: &mut ChaCha8Rng) {
        let current = self.next_set;
        update_population(&mut self.sets[current], &self.params, rng);
        self.shown_set = current;
        self.next_set = (current + 1) % self.sets.len();
    }

    fn snapshot(&self) -> ApertureSnapshot {
        let aperture = &self.params.aperture;
        let objects = self
            .shown()
            .objects
            .iter()
            .map(|o| ObjectSnapshot {
                x: o.position.x,
                y: o.position.y,
                orientation: o.orientation,
                alpha: if self.params.fade_edges { aperture.edge_alpha(o.position) } else { 1.0 },
            })
            .collect();
        ApertureSnapshot {
            aperture: *aperture,
            border: self.params.border.clone(),
            style: self.params.style.clone(),
            objects,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stimulus {
    fields: Vec<ApertureField>,
    rng: ChaCha8Rng,
    frame_index: u64,
    background_color: String,
}

impl Stimulus {
    /// Build every aperture from the resolved trial. Same seed, same stimulus.
    pub fn new(trial: &ResolvedTrial) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(trial.seed);
        let fields: Vec<_> =
            trial.apertures.iter().cloned().map(|p| ApertureField::new(p, &mut rng)).collect();
        debug!(seed = trial.seed, apertures = fields.len(), "stimulus built");
        Self { fields, rng, frame_index: 0, background_color: trial.background_color.clone() }
    }

    /// Step every aperture once; all updates land before the frame is shown.
    pub fn advance_frame(&mut self) {
        for field in self.fields.iter_mut() {
            field.advance(&mut self.rng);
        }
        self.frame_index += 1;
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            frame_index: self.frame_index,
            background_color: self.background_color.clone(),
            apertures: self.fields.iter().map(ApertureField::snapshot).collect(),
        }
    }

    pub fn fields(&self) -> &[ApertureField] {
        &self.fields
    }

    /// Frames advanced so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{params, trial};
    use crate::models::aperture::{Aperture, ApertureShape};
    use crate::models::types::Vec2;

    #[test]
    fn test_same_seed_same_frames() {
        let t = trial(params(50, 0.5, 0.1));
        let mut a = Stimulus::new(&t);
        let mut b = Stimulus::new(&t);
        for _ in 0..10 {
            a.advance_frame();
            b.advance_frame();
        }
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_every_aperture_updates_each_frame() {
        let mut left = params(20, 1.0, 0.0);
        left.aperture = Aperture::new(ApertureShape::Circle, Vec2::new(200.0, 300.0), 200.0, 200.0);
        let mut right = params(30, 1.0, 0.0);
        right.index = 1;
        right.coherent_direction_deg = 180.0;
        right.aperture =
            Aperture::new(ApertureShape::Square, Vec2::new(600.0, 300.0), 200.0, 200.0);
        let mut t = trial(left);
        t.apertures.push(right);

        let mut stim = Stimulus::new(&t);
        stim.advance_frame();
        let snap = stim.snapshot();
        assert_eq!(snap.frame_index, 1);
        assert_eq!(snap.apertures.len(), 2);
        assert_eq!(snap.object_count(), 50);
        assert!(stim.fields()[0].shown().objects.iter().all(|o| o.last_step.x > 0.0));
        assert!(stim.fields()[1].shown().objects.iter().all(|o| o.last_step.x < 0.0));
    }

    #[test]
    fn test_sets_rotate_one_per_frame() {
        let mut p = params(10, 1.0, 0.0);
        p.n_sets = 3;
        let mut stim = Stimulus::new(&trial(p));
        assert_eq!(stim.fields()[0].sets.len(), 3);
        let mut shown = Vec::new();
        for _ in 0..6 {
            let before: Vec<Vec<Vec2>> = stim.fields()[0]
                .sets
                .iter()
                .map(|s| s.objects.iter().map(|o| o.position).collect())
                .collect();
            stim.advance_frame();
            let idx = stim.fields()[0].shown_set_index();
            shown.push(idx);
            for (i, set) in stim.fields()[0].sets.iter().enumerate() {
                let now: Vec<Vec2> = set.objects.iter().map(|o| o.position).collect();
                assert_eq!(now != before[i], i == idx, "only the shown set moves");
            }
        }
        assert_eq!(shown, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_fade_edges_sets_alpha() {
        let mut p = params(200, 0.0, 0.0);
        p.fade_edges = true;
        let mut stim = Stimulus::new(&trial(p.clone()));
        stim.advance_frame();
        let snap = stim.snapshot();
        let alphas: Vec<f64> = snap.apertures[0].objects.iter().map(|o| o.alpha).collect();
        assert!(alphas.iter().all(|a| (0.0..=1.0).contains(a)));
        assert!(alphas.iter().any(|a| *a < 1.0));

        p.fade_edges = false;
        let mut plain = Stimulus::new(&trial(p));
        plain.advance_frame();
        assert!(plain.snapshot().apertures[0].objects.iter().all(|o| o.alpha == 1.0));
    }
}
