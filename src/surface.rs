use crate::error::Error;
use image::{Rgba, RgbImage};
use std::{sync::Arc, time::Duration};

/// A 2-D drawing target laid exactly over the video.
///
/// Every method may fail with [`Error::SurfaceDetached`] once the host has
/// discarded the underlying surface.
pub trait DrawSurface {
    /// Current pixel dimensions as `(width, height)`.
    fn size(&self) -> Result<(u32, u32), Error>;

    fn set_size(&mut self, width: u32, height: u32) -> Result<(), Error>;

    fn clear(&mut self) -> Result<(), Error>;

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), stroke: Stroke)
        -> Result<(), Error>;

    fn fill_circle(
        &mut self,
        center: (f32, f32),
        radius: f32,
        fill: Rgba<u8>,
        outline: Stroke,
    ) -> Result<(), Error>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Rgba<u8>,
    pub width: f32,
}

/// The playing video element as the frame loop sees it.
pub trait VideoSurface: Send + Sync {
    /// Native pixel dimensions as `(width, height)`.
    fn native_size(&self) -> (u32, u32);

    /// Media time of the frame currently shown.
    fn current_time(&self) -> Duration;

    fn current_frame(&self) -> VideoFrame;
}

/// Handle to the frame a detector is asked about.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub media_time: Duration,
    /// Decoded pixels, when the video source exposes them.
    pub pixels: Option<Arc<RgbImage>>,
}
