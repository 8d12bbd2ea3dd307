use crate::{error::Error, point::Point};
use num_traits::ToPrimitive;
use std::ops::RangeInclusive;

/// Landmark taxonomy of the detector. The discriminants are the indices the
/// detector reports keypoints at and must not be renumbered.
#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::ToPrimitive)]
pub enum KeypointKind {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

pub const NUM_KEYPOINTS: usize = 33;

impl KeypointKind {
    pub fn idx(self) -> Result<usize, Error> {
        self.to_usize().ok_or(Error::KeypointVariantToUSize(self))
    }
}

/// Coarse grouping of keypoint indices used to pick overlay colors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BodyRegion {
    Face,
    UpperBody,
    Hands,
    LowerBody,
}

impl BodyRegion {
    const FACE: RangeInclusive<usize> = 0..=10;
    const UPPER_BODY: RangeInclusive<usize> = 11..=16;
    const HANDS: RangeInclusive<usize> = 17..=22;

    /// Indices past the lower body range are still classified as lower body.
    pub fn of(index: usize) -> Self {
        if Self::FACE.contains(&index) {
            Self::Face
        } else if Self::UPPER_BODY.contains(&index) {
            Self::UpperBody
        } else if Self::HANDS.contains(&index) {
            Self::Hands
        } else {
            Self::LowerBody
        }
    }
}

/// A single landmark: normalized position plus detector confidence.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Keypoint {
    pub point: Point,
    pub visibility: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, visibility: f32) -> Result<Self, Error> {
        Ok(Self {
            point: Point::new(x, y)?,
            visibility,
        })
    }
}

/// Metric-space landmark reported alongside the normalized ones. Unused by the
/// overlay, carried so detector implementations can return the full result.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct WorldKeypoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
}

/// Result of one detector query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub landmarks: Vec<Vec<Keypoint>>,
    pub world_landmarks: Vec<Vec<WorldKeypoint>>,
}

impl Detection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(keypoints: Vec<Keypoint>) -> Self {
        Self {
            landmarks: vec![keypoints],
            world_landmarks: Vec::new(),
        }
    }

    /// The skeleton of the single tracked person, if one was found.
    pub fn skeleton(&self) -> Option<&[Keypoint]> {
        self.landmarks
            .first()
            .map(Vec::as_slice)
            .filter(|keypoints| !keypoints.is_empty())
    }
}

pub mod constants {
    use crate::pose::KeypointKind::{self, *};

    pub const CONNECTIONS: [(KeypointKind, KeypointKind); 28] = [
        // face
        (Nose, LeftEyeInner),
        (LeftEyeInner, LeftEye),
        (LeftEye, LeftEyeOuter),
        (LeftEyeOuter, LeftEar),
        (Nose, RightEyeInner),
        (RightEyeInner, RightEye),
        (RightEye, RightEyeOuter),
        (RightEyeOuter, RightEar),
        // torso
        (LeftShoulder, RightShoulder),
        (LeftShoulder, LeftHip),
        (RightShoulder, RightHip),
        (LeftHip, RightHip),
        // arms
        (LeftShoulder, LeftElbow),
        (LeftElbow, LeftWrist),
        (LeftWrist, LeftPinky),
        (LeftPinky, LeftIndex),
        (RightShoulder, RightElbow),
        (RightElbow, RightWrist),
        (RightWrist, RightPinky),
        (RightPinky, RightIndex),
        // legs
        (LeftHip, LeftKnee),
        (LeftKnee, LeftAnkle),
        (LeftAnkle, LeftHeel),
        (LeftHeel, LeftFootIndex),
        (RightHip, RightKnee),
        (RightKnee, RightAnkle),
        (RightAnkle, RightHeel),
        (RightHeel, RightFootIndex),
    ];
}
