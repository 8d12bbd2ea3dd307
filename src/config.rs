use crate::{error::Error, point::Vector2};
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_SLOPE_ANGLE_DEGREES: f32 = 28.0;
const DEFAULT_VISIBILITY_THRESHOLD: f32 = 0.3;
const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;
const DEFAULT_FRAME_RATE: u32 = 60;

/// Process-wide settings. Built once at startup and shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tilt of the slope reference away from vertical.
    pub slope_angle_degrees: f32,
    /// Keypoints below this visibility are never drawn.
    pub visibility_threshold: f32,
    /// Rate of the interval frame scheduler.
    pub frame_rate: u32,
    pub detector: DetectorConfig,
    pub overlay: OverlayStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub runtime_assets: Option<PathBuf>,
    pub model_asset: PathBuf,
    pub num_poses: usize,
    pub min_pose_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

/// Colors are RGBA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub face_color: [u8; 4],
    pub limb_color: [u8; 4],
    pub leg_color: [u8; 4],
    pub torso_color: [u8; 4],
    pub joint_outline_color: [u8; 4],
    pub line_width: u32,
    pub joint_radius: u32,
    pub joint_outline_width: u32,
}

/// The two fixed directions the torso is measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct References {
    pub vertical: Vector2,
    pub slope: Vector2,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            slope_angle_degrees: DEFAULT_SLOPE_ANGLE_DEGREES,
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            frame_rate: DEFAULT_FRAME_RATE,
            detector: DetectorConfig::default(),
            overlay: OverlayStyle::default(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            runtime_assets: None,
            model_asset: PathBuf::from("models/pose_landmarks.jsonl"),
            num_poses: 1,
            min_pose_detection_confidence: DEFAULT_MIN_CONFIDENCE,
            min_tracking_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            face_color: [0, 255, 255, 255],
            limb_color: [0, 255, 0, 255],
            leg_color: [255, 165, 0, 255],
            torso_color: [255, 0, 255, 255],
            joint_outline_color: [255, 255, 255, 255],
            line_width: 3,
            joint_radius: 4,
            joint_outline_width: 1,
        }
    }
}

impl OverlayStyle {
    pub(crate) fn rgba(color: [u8; 4]) -> Rgba<u8> {
        Rgba(color)
    }
}

fn check_unit_interval(name: &'static str, value: f32) -> Result<(), Error> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(name, format!("{value} is outside [0, 1]")))
    }
}

impl Config {
    pub fn load<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::ReadConfig(e, path.to_owned()))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| Error::ParseConfig(e, path.to_owned()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..90.0).contains(&self.slope_angle_degrees) {
            return Err(Error::InvalidConfig(
                "slope_angle_degrees",
                format!("{} is outside [0, 90)", self.slope_angle_degrees),
            ));
        }
        if self.frame_rate == 0 {
            return Err(Error::InvalidConfig("frame_rate", "must be non-zero".into()));
        }
        if self.detector.num_poses != 1 {
            return Err(Error::UnsupportedPoseCount(self.detector.num_poses));
        }
        check_unit_interval("visibility_threshold", self.visibility_threshold)?;
        check_unit_interval(
            "detector.min_pose_detection_confidence",
            self.detector.min_pose_detection_confidence,
        )?;
        check_unit_interval(
            "detector.min_tracking_confidence",
            self.detector.min_tracking_confidence,
        )
    }

    /// Vertical points up the frame, which is negative y in image coordinates.
    pub fn references(&self) -> References {
        let vertical = Vector2::new(0.0, -1.0);
        References {
            vertical,
            slope: vertical.rotated(self.slope_angle_degrees),
        }
    }
}
