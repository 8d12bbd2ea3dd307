//! Real-time torso angle overlay for pose landmark detections.
//!
//! A [`FrameLoopController`] pulls one detection per frame from a shared
//! detector owned by a [`DetectorGateway`], derives the lean and slope angles
//! of the torso, and draws a color coded skeleton on a [`DrawSurface`] kept at
//! the video's native size.

pub mod binder;
pub mod canvas;
pub mod config;
pub mod controller;
pub mod detector;
pub mod error;
pub mod gateway;
pub mod geometry;
pub mod point;
pub mod pose;
pub mod render;
pub mod replay;
pub mod scheduler;
pub mod surface;
pub mod video;

pub use binder::{PlaybackBinder, PlaybackDecision, PlaybackEvent};
pub use canvas::Canvas;
pub use config::Config;
pub use controller::{FrameLoopController, LoopState, SharedSurface};
pub use detector::{Detector, DetectorFactory, DetectorOptions, RunningMode};
pub use error::Error;
pub use gateway::DetectorGateway;
pub use geometry::{angle_between, torso_vector, AnglePair};
pub use render::OverlayRenderer;
pub use surface::{DrawSurface, VideoFrame, VideoSurface};
