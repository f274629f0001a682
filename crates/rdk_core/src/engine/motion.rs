//! Motion update engine
//!
//! One call to `step_object` advances one object by one frame:
//!
//! 1. Resolve the active policy (Mixture objects draw `r ∈ [0, 1)` now)
//! 2. Apply the policy step
//! 3. Update orientation (oriented objects)
//! 4. Age the object; an expired object is relocated uniformly and its counter reset
//! 5. Otherwise bounds-test and apply the reinsertion policy on exit
//!
//! Parameters come in explicitly per aperture; nothing here reads shared state.

use super::population::{orientation_angle, Population};
use crate::models::aperture::Aperture;
use crate::models::config::{ApertureParams, CongruencyMode, OrientationParams, ReinsertionPolicy};
use crate::models::object::{MotionPolicy, OrientationPolicy, TrackedObject};
use crate::models::types::Vec2;
use rand::Rng;
use std::f64::consts::PI;

/// Largest f64 below 1, keeps mirrored draws inside `[0, 1)`.
const BELOW_ONE: f64 = 1.0 - f64::EPSILON / 2.0;

/// Advance every object of one population by one frame.
pub fn update_population<R: Rng + ?Sized>(
    population: &mut Population,
    params: &ApertureParams,
    rng: &mut R,
) {
    for object in population.objects.iter_mut() {
        step_object(object, params, rng);
    }
}

pub fn step_object<R: Rng + ?Sized>(
    object: &mut TrackedObject,
    params: &ApertureParams,
    rng: &mut R,
) {
    let (policy, draw) = match object.policy {
        MotionPolicy::Mixture(weights) => {
            let r: f64 = rng.gen();
            (weights.pick(r), Some(r))
        }
        fixed => (fixed, None),
    };

    let step = apply_policy(object, policy, &params.aperture, rng);

    if let (Some(orientation_policy), Some(o)) = (object.orientation_policy, &params.orientation)
    {
        let concrete = resolve_orientation(orientation_policy, o, draw, rng);
        object.orientation = Some(orientation_angle(object, concrete, o));
    }

    if let (Some(age), Some(limit)) = (object.life, params.life_limit) {
        let age = age + 1;
        if age >= limit {
            object.position = params.aperture.sample_uniform(rng);
            object.life = Some(0);
            object.last_step = Vec2::ZERO;
            return;
        }
        object.life = Some(age);
    }

    object.last_step = step;
    if !params.aperture.contains(object.position) {
        reinsert(object, &params.aperture, params.reinsertion, rng);
    }
}

/// Apply one policy step, returning the displacement (zero for teleports).
fn apply_policy<R: Rng + ?Sized>(
    object: &mut TrackedObject,
    policy: MotionPolicy,
    aperture: &Aperture,
    rng: &mut R,
) -> Vec2 {
    let step = match policy {
        MotionPolicy::ConstantDirection => object.coherent_velocity,
        MotionPolicy::OppositeDirection => -object.coherent_velocity,
        MotionPolicy::RandomWalk => Vec2::from_heading(rng.gen_range(-PI..=PI), object.speed),
        MotionPolicy::RandomDirection => object.own_velocity,
        MotionPolicy::RandomPosition => {
            object.position = aperture.sample_uniform(rng);
            return Vec2::ZERO;
        }
        // Mixture is resolved by the caller; a nested mixture never occurs.
        MotionPolicy::Mixture(weights) => {
            return apply_policy(object, weights.pick(rng.gen()), aperture, rng);
        }
    };
    object.position += step;
    step
}

/// Concrete orientation policy for this frame.
///
/// Fixed policies pass through. Mixture policies draw from the movement
/// draw according to the congruency mode: the same quantile (congruent),
/// the mirrored quantile (incongruent) or a fresh draw (independent).
fn resolve_orientation<R: Rng + ?Sized>(
    policy: OrientationPolicy,
    params: &OrientationParams,
    movement_draw: Option<f64>,
    rng: &mut R,
) -> OrientationPolicy {
    let OrientationPolicy::Mixture { coherence, opposite } = policy else {
        return policy;
    };
    let r = match (params.congruency, movement_draw) {
        (CongruencyMode::Congruent, Some(r)) => r,
        (CongruencyMode::Incongruent, Some(r)) => (1.0 - r).min(BELOW_ONE),
        _ => rng.gen(),
    };
    OrientationPolicy::pick(coherence, opposite, r)
}

/// Bring an object that left the aperture back in.
pub fn reinsert<R: Rng + ?Sized>(
    object: &mut TrackedObject,
    aperture: &Aperture,
    policy: ReinsertionPolicy,
    rng: &mut R,
) {
    object.position = match policy {
        ReinsertionPolicy::Random => aperture.sample_uniform(rng),
        ReinsertionPolicy::OppositeEdge if aperture.shape.is_round() => {
            aperture.reflect_through_center(object.position)
        }
        ReinsertionPolicy::OppositeEdge => opposite_edge_entry(aperture, object.last_step, rng),
    };
}

/// Probability that a box exit re-enters through a vertical (left/right) edge.
///
/// Objects cross a vertical edge at a rate proportional to `|dx| · V` and a
/// horizontal edge at `|dy| · H`. With no displacement at all the edge
/// lengths alone decide: `V / (V + H)`.
pub fn vertical_edge_probability(aperture: &Aperture, step: Vec2) -> f64 {
    let (h, v) = aperture.axes();
    let through_vertical = step.x.abs() * v;
    let through_horizontal = step.y.abs() * h;
    let total = through_vertical + through_horizontal;
    if total > 0.0 && total.is_finite() {
        through_vertical / total
    } else {
        v / (v + h)
    }
}

/// Entry point on the edge opposite the exit direction, uniform along that edge.
fn opposite_edge_entry<R: Rng + ?Sized>(aperture: &Aperture, step: Vec2, rng: &mut R) -> Vec2 {
    let (h, v) = aperture.axes();
    let c = aperture.center;
    if rng.gen::<f64>() < vertical_edge_probability(aperture, step) {
        let side = entry_side(step.x, rng);
        Vec2::new(c.x + side * h, c.y + rng.gen_range(-v..=v))
    } else {
        let side = entry_side(step.y, rng);
        Vec2::new(c.x + rng.gen_range(-h..=h), c.y + side * v)
    }
}

/// Moving in +axis → enter from the −axis edge. No motion on the axis → random side.
fn entry_side<R: Rng + ?Sized>(component: f64, rng: &mut R) -> f64 {
    if component > 0.0 {
        -1.0
    } else if component < 0.0 {
        1.0
    } else if rng.gen_bool(0.5) {
        1.0
    } else {
        -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::population::build_population;
    use crate::engine::test_support::{object_at, params};
    use crate::models::aperture::ApertureShape;
    use crate::models::config::{NoiseType, SignalSelection, TaskAxis};
    use crate::models::object::MixtureWeights;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_constant_direction_moves_exactly() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let p = params(1, 1.0, 0.0);
        let start = p.aperture.center;
        let mut obj = object_at(start, MotionPolicy::ConstantDirection, 5.0, 0.0);
        for frame in 1..=10 {
            step_object(&mut obj, &p, &mut rng);
            assert!((obj.position.x - (start.x + 5.0 * frame as f64)).abs() < 1e-9);
            assert!((obj.position.y - start.y).abs() < 1e-12);
            assert_eq!(obj.last_step, Vec2::new(5.0, 0.0));
        }
    }

    #[test]
    fn test_opposite_direction_moves_backwards() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let p = params(1, 0.0, 1.0);
        let start = p.aperture.center;
        let mut obj = object_at(start, MotionPolicy::OppositeDirection, 3.0, 0.0);
        step_object(&mut obj, &p, &mut rng);
        assert_eq!(obj.position, start - Vec2::new(3.0, 0.0));
    }

    #[test]
    fn test_random_position_stays_inside() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let p = params(1, 0.0, 0.0);
        let mut obj = object_at(p.aperture.center, MotionPolicy::RandomPosition, 5.0, 0.0);
        for _ in 0..200 {
            let before = obj.position;
            step_object(&mut obj, &p, &mut rng);
            assert!(p.aperture.contains(obj.position));
            assert_ne!(obj.position, before);
            assert_eq!(obj.last_step, Vec2::ZERO);
        }
    }

    #[test]
    fn test_random_walk_step_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let p = params(1, 0.0, 0.0);
        let mut obj = object_at(p.aperture.center, MotionPolicy::RandomWalk, 4.0, 0.0);
        let mut headings = Vec::new();
        for _ in 0..20 {
            step_object(&mut obj, &p, &mut rng);
            assert!((obj.last_step.length() - 4.0).abs() < 1e-9);
            headings.push(obj.last_step);
        }
        assert!(headings.windows(2).any(|w| w[0] != w[1]), "heading re-drawn every frame");
    }

    #[test]
    fn test_random_direction_is_fixed() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let p = params(1, 0.0, 0.0);
        let mut obj = object_at(p.aperture.center, MotionPolicy::RandomDirection, 2.0, 0.0);
        obj.own_velocity = Vec2::new(0.0, 2.0);
        step_object(&mut obj, &p, &mut rng);
        step_object(&mut obj, &p, &mut rng);
        assert_eq!(obj.position, p.aperture.center + Vec2::new(0.0, 4.0));
    }

    #[test]
    fn test_mixture_frequencies() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let p = params(1, 0.6, 0.2);
        let weights =
            MixtureWeights { coherence: 0.6, opposite: 0.2, noise: NoiseType::RandomPosition };
        let (mut forward, mut backward, mut noise) = (0, 0, 0);
        let n = 20_000;
        for _ in 0..n {
            let mut obj = object_at(p.aperture.center, MotionPolicy::Mixture(weights), 1.0, 0.0);
            step_object(&mut obj, &p, &mut rng);
            match obj.last_step {
                s if s == Vec2::new(1.0, 0.0) => forward += 1,
                s if s == Vec2::new(-1.0, 0.0) => backward += 1,
                _ => noise += 1,
            }
        }
        let frac = |k: usize| k as f64 / n as f64;
        assert!((frac(forward) - 0.6).abs() < 0.02);
        assert!((frac(backward) - 0.2).abs() < 0.02);
        assert!((frac(noise) - 0.2).abs() < 0.02);
    }

    #[test]
    fn test_round_reinsertion_is_point_symmetric() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for shape in [ApertureShape::Circle, ApertureShape::Ellipse] {
            let mut p = params(1, 1.0, 0.0);
            p.aperture = Aperture::new(shape, Vec2::new(50.0, -20.0), 200.0, 120.0);
            let center = p.aperture.center;
            for _ in 0..100 {
                let angle = rng.gen_range(-PI..=PI);
                let radius = rng.gen_range(1.01..2.0);
                let exit = Vec2::new(
                    center.x + radius * angle.cos() * p.aperture.horizontal_axis,
                    center.y + radius * angle.sin() * p.aperture.vertical_axis,
                );
                let mut obj = object_at(exit, MotionPolicy::ConstantDirection, 1.0, 0.0);
                reinsert(&mut obj, &p.aperture, ReinsertionPolicy::OppositeEdge, &mut rng);
                let expected = center - (exit - center);
                assert!((obj.position.x - expected.x).abs() < 1e-9);
                assert!((obj.position.y - expected.y).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_box_reinsertion_enters_from_opposite_edge() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let ap = Aperture::new(ApertureShape::Rectangle, Vec2::ZERO, 600.0, 400.0);
        for _ in 0..200 {
            let mut obj =
                object_at(Vec2::new(301.0, 0.0), MotionPolicy::ConstantDirection, 2.0, 0.0);
            obj.last_step = Vec2::new(2.0, 0.0);
            reinsert(&mut obj, &ap, ReinsertionPolicy::OppositeEdge, &mut rng);
            // Purely horizontal motion always re-enters through the left edge.
            assert_eq!(obj.position.x, -300.0);
            assert!(obj.position.y.abs() <= 200.0);
            assert!(ap.contains(obj.position));
        }
    }

    #[test]
    fn test_box_reinsertion_edge_ratio_converges() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let ap = Aperture::new(ApertureShape::Rectangle, Vec2::ZERO, 600.0, 200.0);
        let (h, v) = ap.axes();
        let trials = 40_000;
        let mut vertical = 0usize;
        let mut expected_sum = 0.0;
        for _ in 0..trials {
            let step = Vec2::from_heading(rng.gen_range(-PI..=PI), 3.0);
            expected_sum += step.x.abs() * v / (step.x.abs() * v + step.y.abs() * h);
            let mut obj = object_at(Vec2::new(400.0, 400.0), MotionPolicy::RandomWalk, 3.0, 0.0);
            obj.last_step = step;
            reinsert(&mut obj, &ap, ReinsertionPolicy::OppositeEdge, &mut rng);
            if obj.position.x.abs() == h {
                vertical += 1;
            } else {
                assert_eq!(obj.position.y.abs(), v);
            }
        }
        let expected = expected_sum / trials as f64;
        let observed = vertical as f64 / trials as f64;
        assert!((observed - expected).abs() < 0.02, "observed {observed}, expected {expected}");
    }

    #[test]
    fn test_edge_probability_without_motion_uses_aspect() {
        let ap = Aperture::new(ApertureShape::Rectangle, Vec2::ZERO, 600.0, 200.0);
        assert!((vertical_edge_probability(&ap, Vec2::ZERO) - 0.25).abs() < 1e-12);
        assert_eq!(vertical_edge_probability(&ap, Vec2::new(1.0, 0.0)), 1.0);
        assert_eq!(vertical_edge_probability(&ap, Vec2::new(0.0, -1.0)), 0.0);
    }

    #[test]
    fn test_random_reinsertion_lands_inside() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let ap = Aperture::new(ApertureShape::Square, Vec2::ZERO, 100.0, 100.0);
        let mut obj = object_at(Vec2::new(80.0, 0.0), MotionPolicy::ConstantDirection, 1.0, 0.0);
        reinsert(&mut obj, &ap, ReinsertionPolicy::Random, &mut rng);
        assert!(ap.contains(obj.position));
    }

    #[test]
    fn test_exit_triggers_reinsertion_in_step() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut p = params(1, 1.0, 0.0);
        p.aperture = Aperture::new(ApertureShape::Square, Vec2::ZERO, 100.0, 100.0);
        let mut obj = object_at(Vec2::new(49.0, 10.0), MotionPolicy::ConstantDirection, 2.0, 0.0);
        step_object(&mut obj, &p, &mut rng);
        assert_eq!(obj.position.x, -50.0);
        assert_eq!(obj.last_step, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_life_limit_relocates_every_k_frames() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let k = 7u32;
        let mut p = params(150, 1.0, 0.0);
        p.speed = 0.0;
        p.life_limit = Some(k);
        let mut pop = build_population(&p, &mut rng);
        let mut last_move = vec![0u32; pop.len()];
        for frame in 1..=60u32 {
            let before: Vec<Vec2> = pop.objects.iter().map(|o| o.position).collect();
            update_population(&mut pop, &p, &mut rng);
            for (i, o) in pop.objects.iter().enumerate() {
                if o.position != before[i] {
                    last_move[i] = frame;
                    assert_eq!(o.life, Some(0));
                }
                assert!(frame - last_move[i] < k, "object {i} unmoved for {k} frames");
            }
        }
    }

    #[test]
    fn test_different_rule_congruent_orientation_tracks_movement() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let mut p = params(400, 0.5, 0.0);
        p.signal_selection = SignalSelection::Different;
        p.orientation = Some(OrientationParams {
            coherence: 0.5,
            opposite_coherence: 0.0,
            coherent_orientation_deg: 0.0,
            task_axis: TaskAxis::Movement,
            congruency: CongruencyMode::Congruent,
        });
        let mut pop = build_population(&p, &mut rng);
        for o in pop.objects.iter_mut() {
            o.own_orientation = 1.0;
        }
        update_population(&mut pop, &p, &mut rng);
        for o in &pop.objects {
            let moved_coherently = o.last_step == o.coherent_velocity;
            assert_eq!(moved_coherently, o.orientation == Some(0.0));
        }
    }

    #[test]
    fn test_different_rule_incongruent_orientation_opposes_movement() {
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        let mut p = params(400, 0.5, 0.0);
        p.signal_selection = SignalSelection::Different;
        p.orientation = Some(OrientationParams {
            coherence: 0.5,
            opposite_coherence: 0.0,
            coherent_orientation_deg: 0.0,
            task_axis: TaskAxis::Movement,
            congruency: CongruencyMode::Incongruent,
        });
        let mut pop = build_population(&p, &mut rng);
        for o in pop.objects.iter_mut() {
            o.own_orientation = 1.0;
        }
        update_population(&mut pop, &p, &mut rng);
        for o in &pop.objects {
            let moved_coherently = o.last_step == o.coherent_velocity;
            assert_ne!(moved_coherently, o.orientation == Some(0.0));
        }
    }

    #[test]
    fn test_coherent_population_drifts_right() {
        let mut rng = ChaCha8Rng::seed_from_u64(15);
        let mut p = params(300, 1.0, 0.0);
        p.aperture = Aperture::new(ApertureShape::Rectangle, Vec2::new(400.0, 300.0), 600.0, 400.0);
        p.noise_type = NoiseType::RandomDirection;
        let mut pop = build_population(&p, &mut rng);
        let mut total = Vec2::ZERO;
        for _ in 0..50 {
            update_population(&mut pop, &p, &mut rng);
            total += pop.objects.iter().fold(Vec2::ZERO, |acc, o| acc + o.last_step);
        }
        let mean = total * (1.0 / (50.0 * 300.0));
        assert!((mean.x - 5.0).abs() < 1e-9);
        assert!(mean.y.abs() < 1e-9);
    }
}
