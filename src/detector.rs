use crate::{config::DetectorConfig, error::Error, pose::Detection, surface::VideoFrame};
use async_trait::async_trait;
use std::{path::PathBuf, time::Duration};

/// How the detector is fed frames.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunningMode {
    Image,
    Video,
}

/// Construction parameters handed to a [`DetectorFactory`] as is.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorOptions {
    pub runtime_assets: Option<PathBuf>,
    pub model_asset: PathBuf,
    pub running_mode: RunningMode,
    pub num_poses: usize,
    pub min_pose_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl From<&DetectorConfig> for DetectorOptions {
    fn from(config: &DetectorConfig) -> Self {
        Self {
            runtime_assets: config.runtime_assets.clone(),
            model_asset: config.model_asset.clone(),
            running_mode: RunningMode::Video,
            num_poses: config.num_poses,
            min_pose_detection_confidence: config.min_pose_detection_confidence,
            min_tracking_confidence: config.min_tracking_confidence,
        }
    }
}

/// A ready pose landmark detector.
///
/// Queries take `&self`; implementations that cannot serve concurrent queries
/// must serialize them internally.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Detect at most one skeleton in `frame`.
    ///
    /// `timestamp` must be strictly greater than the one passed to the previous
    /// call on this detector.
    async fn detect_for_video(
        &self,
        frame: &VideoFrame,
        timestamp: Duration,
    ) -> Result<Detection, Error>;
}

/// Asynchronously builds a [`Detector`], loading whatever runtime assets and
/// model artifact it needs.
#[async_trait]
pub trait DetectorFactory: Send + Sync + 'static {
    type Detector: Detector + 'static;

    async fn create(&self, options: &DetectorOptions) -> Result<Self::Detector, Error>;
}
