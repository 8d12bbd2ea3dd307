//! Torso orientation angles derived from a detected skeleton.
//!
//! Visibility is deliberately not consulted here: low confidence shoulders and
//! hips still contribute to the torso vector. The overlay renderer filters by
//! visibility, this module does not.

use crate::{
    config::References,
    point::Vector2,
    pose::{Keypoint, KeypointKind, NUM_KEYPOINTS},
};
use std::fmt;

/// Direction from the hip midpoint to the shoulder midpoint.
///
/// Returns `None` when fewer than [`NUM_KEYPOINTS`] keypoints were supplied.
pub fn torso_vector(keypoints: &[Keypoint]) -> Option<Vector2> {
    if keypoints.len() < NUM_KEYPOINTS {
        return None;
    }
    let at = |kind: KeypointKind| Some(keypoints.get(kind.idx().ok()?)?.point);

    let shoulders = at(KeypointKind::LeftShoulder)?.midpoint(at(KeypointKind::RightShoulder)?);
    let hips = at(KeypointKind::LeftHip)?.midpoint(at(KeypointKind::RightHip)?);
    Some(shoulders - hips)
}

/// Unsigned angle in degrees between two vectors, in `[0, 180]`.
///
/// Returns `None` if either vector has zero magnitude.
pub fn angle_between(v1: Vector2, v2: Vector2) -> Option<f32> {
    let magnitudes = v1.magnitude() * v2.magnitude();
    if magnitudes == 0.0 || !magnitudes.is_finite() {
        return None;
    }
    let cos = (v1.dot(v2) / magnitudes).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

fn round_to_tenth(degrees: f32) -> f32 {
    (degrees * 10.0).round() / 10.0
}

/// Lean and slope angles of the torso, each rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnglePair {
    pub lean: Option<f32>,
    pub slope: Option<f32>,
}

impl AnglePair {
    pub const UNAVAILABLE: Self = Self {
        lean: None,
        slope: None,
    };

    /// Angles of the torso in `keypoints` against both references.
    pub fn from_keypoints(keypoints: &[Keypoint], references: &References) -> Self {
        torso_vector(keypoints).map_or(Self::UNAVAILABLE, |torso| Self {
            lean: angle_between(torso, references.vertical).map(round_to_tenth),
            slope: angle_between(torso, references.slope).map(round_to_tenth),
        })
    }

    /// Take the available angles of `update`, keeping ours where it has none.
    pub fn merged(self, update: Self) -> Self {
        Self {
            lean: update.lean.or(self.lean),
            slope: update.slope.or(self.slope),
        }
    }

    pub fn is_available(&self) -> bool {
        self.lean.is_some() || self.slope.is_some()
    }
}

struct Degrees(Option<f32>);

impl fmt::Display for Degrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(degrees) => write!(f, "{degrees:.1}°"),
            None => f.write_str("--"),
        }
    }
}

impl fmt::Display for AnglePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lean: {}, slope: {}",
            Degrees(self.lean),
            Degrees(self.slope)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{angle_between, torso_vector, AnglePair};
    use crate::{
        config::Config,
        point::Vector2,
        pose::{Keypoint, KeypointKind, NUM_KEYPOINTS},
    };
    use assert_approx_eq::assert_approx_eq;

    fn skeleton(shoulders: [(f32, f32); 2], hips: [(f32, f32); 2]) -> Vec<Keypoint> {
        let mut keypoints = vec![Keypoint::new(0.5, 0.5, 0.0).unwrap(); NUM_KEYPOINTS];
        let mut place = |kind: KeypointKind, (x, y): (f32, f32)| {
            keypoints[kind as usize] = Keypoint::new(x, y, 0.1).unwrap();
        };
        place(KeypointKind::LeftShoulder, shoulders[0]);
        place(KeypointKind::RightShoulder, shoulders[1]);
        place(KeypointKind::LeftHip, hips[0]);
        place(KeypointKind::RightHip, hips[1]);
        keypoints
    }

    #[test]
    fn short_sequences_have_no_torso() {
        for len in [0, 1, 25, NUM_KEYPOINTS - 1] {
            let keypoints = vec![Keypoint::new(0.5, 0.5, 1.0).unwrap(); len];
            assert_eq!(torso_vector(&keypoints), None);
        }
    }

    #[test]
    fn upright_torso_points_up() {
        let keypoints = skeleton([(0.4, 0.2), (0.6, 0.2)], [(0.4, 0.8), (0.6, 0.8)]);
        let torso = torso_vector(&keypoints).unwrap();
        assert_approx_eq!(torso.x, 0.0);
        assert_approx_eq!(torso.y, -0.6);
    }

    #[test]
    fn low_visibility_still_contributes() {
        // every keypoint in `skeleton` is below the overlay threshold
        let keypoints = skeleton([(0.5, 0.2), (0.7, 0.2)], [(0.4, 0.8), (0.6, 0.8)]);
        let torso = torso_vector(&keypoints).unwrap();
        assert_approx_eq!(torso.x, 0.1);
    }

    #[test]
    fn known_angles() {
        let up = Vector2::new(0.0, -1.0);
        assert_approx_eq!(angle_between(up, up).unwrap(), 0.0);
        assert_approx_eq!(angle_between(up, Vector2::new(1.0, 0.0)).unwrap(), 90.0);
        assert_approx_eq!(angle_between(up, Vector2::new(0.0, 1.0)).unwrap(), 180.0);
        assert_eq!(angle_between(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)), None);
        assert_eq!(angle_between(Vector2::new(1.0, 0.0), Vector2::new(0.0, 0.0)), None);
    }

    #[test]
    fn angles_stay_in_range() {
        let mut rng = fastrand::Rng::with_seed(28);
        let component = |rng: &mut fastrand::Rng| {
            let magnitude = 10f32.powf(rng.f32() * 8.0 - 4.0);
            if rng.bool() {
                magnitude
            } else {
                -magnitude
            }
        };
        for _ in 0..10_000 {
            let v1 = Vector2::new(component(&mut rng), component(&mut rng));
            let v2 = Vector2::new(component(&mut rng), component(&mut rng));
            let angle = angle_between(v1, v2).unwrap();
            assert!((0.0..=180.0).contains(&angle), "{angle} for {v1:?} {v2:?}");
        }
        // parallel and anti-parallel vectors whose normalized dot overshoots 1
        let v = Vector2::new(0.1, 0.7);
        assert!(angle_between(v, v * 3.0).is_some());
        assert!(angle_between(v, v * -3.0).is_some());
    }

    #[test]
    fn forward_and_backward_lean_have_the_same_magnitude() {
        let references = Config::default().references();
        let forward = skeleton([(0.5, 0.2), (0.7, 0.2)], [(0.4, 0.8), (0.6, 0.8)]);
        let backward = skeleton([(0.3, 0.2), (0.5, 0.2)], [(0.4, 0.8), (0.6, 0.8)]);
        let forward = AnglePair::from_keypoints(&forward, &references);
        let backward = AnglePair::from_keypoints(&backward, &references);
        assert_eq!(forward.lean, backward.lean);
        assert_ne!(forward.slope, backward.slope);
    }

    #[test]
    fn angle_pair_rounds_and_formats() {
        let references = Config::default().references();
        let keypoints = skeleton([(0.4, 0.2), (0.6, 0.2)], [(0.4, 0.8), (0.6, 0.8)]);
        let angles = AnglePair::from_keypoints(&keypoints, &references);
        assert_eq!(angles.lean, Some(0.0));
        assert_eq!(angles.slope, Some(28.0));
        assert_eq!(angles.to_string(), "lean: 0.0°, slope: 28.0°");
        assert_eq!(AnglePair::UNAVAILABLE.to_string(), "lean: --, slope: --");
    }

    #[test]
    fn missing_torso_keeps_previous_angles() {
        let references = Config::default().references();
        let previous = AnglePair {
            lean: Some(12.5),
            slope: Some(40.5),
        };
        let update = AnglePair::from_keypoints(&[], &references);
        assert_eq!(update, AnglePair::UNAVAILABLE);
        assert_eq!(previous.merged(update), previous);
    }
}
