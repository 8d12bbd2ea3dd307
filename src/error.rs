use std::{path::PathBuf, sync::Arc, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create pose detector")]
    CreateDetector(#[source] Arc<Error>),

    #[error("failed to read model asset: {1:?}")]
    ReadModelAsset(#[source] std::io::Error, PathBuf),

    #[error("runtime assets location does not exist: {0:?}")]
    MissingRuntimeAssets(PathBuf),

    #[error("failed to parse landmark record on line {1}")]
    ParseLandmarkRecord(#[source] serde_json::Error, usize),

    #[error("landmark record on line {0} is not in increasing time order")]
    UnorderedLandmarkRecord(usize),

    #[error("detector is configured for {0} poses, only a single pose is supported")]
    UnsupportedPoseCount(usize),

    #[error("detection timestamp {got:?} is not after the previous timestamp {previous:?}")]
    TimestampOutOfOrder { previous: Duration, got: Duration },

    #[error("draw surface is no longer attached")]
    SurfaceDetached,

    #[error("failed to save overlay image to {1:?}")]
    SaveOverlay(#[source] image::ImageError, PathBuf),

    #[error("failed to convert keypoint variant to usize: {0:?}")]
    KeypointVariantToUSize(crate::pose::KeypointKind),

    #[error("failed to construct NotNan from f32: {1}")]
    ConstructNotNan(#[source] ordered_float::FloatIsNan, f32),

    #[error("failed to read config file: {1:?}")]
    ReadConfig(#[source] std::io::Error, PathBuf),

    #[error("failed to parse config file: {1:?}")]
    ParseConfig(#[source] toml::de::Error, PathBuf),

    #[error("invalid config value for {0}: {1}")]
    InvalidConfig(&'static str, String),
}

impl Error {
    /// Whether this error means the render target went away underneath us.
    pub(crate) fn is_detached(&self) -> bool {
        matches!(self, Self::SurfaceDetached)
    }
}
