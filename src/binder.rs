use crate::{
    controller::{FrameLoopController, SharedSurface},
    detector::DetectorFactory,
    error::Error,
    surface::{DrawSurface, VideoSurface},
};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Play,
    Pause,
    Ended,
}

/// Whether the player may carry on with the event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlaybackDecision {
    Proceed,
    /// Playback must be paused again, the detector is not ready.
    Rejected,
}

/// Wires a player's events to a [`FrameLoopController`].
pub struct PlaybackBinder<F, V, S>
where
    F: DetectorFactory,
{
    controller: FrameLoopController<F>,
    video: Arc<V>,
    surface: SharedSurface<S>,
}

impl<F, V, S> PlaybackBinder<F, V, S>
where
    F: DetectorFactory,
    V: VideoSurface + 'static,
    S: DrawSurface + Send + 'static,
{
    pub fn new(controller: FrameLoopController<F>, video: Arc<V>, surface: SharedSurface<S>) -> Self {
        Self {
            controller,
            video,
            surface,
        }
    }

    pub fn controller(&self) -> &FrameLoopController<F> {
        &self.controller
    }

    pub fn surface(&self) -> &SharedSurface<S> {
        &self.surface
    }

    /// Start loading the detector. A failure is returned so the player can
    /// show it and offer a retry by mounting again.
    pub async fn mount(&self) -> Result<(), Error> {
        self.controller.initialize().await
    }

    pub async fn handle(&self, event: PlaybackEvent) -> Result<PlaybackDecision, Error> {
        debug!(message = "playback event", ?event);
        match event {
            PlaybackEvent::Play => {
                if !self.controller.is_ready() {
                    warn!(
                        message = "rejecting playback, pose detector is not ready",
                        initializing = self.controller.is_initializing(),
                    );
                    return Ok(PlaybackDecision::Rejected);
                }
                self.controller.start(&self.video, &self.surface).await?;
            }
            PlaybackEvent::Pause | PlaybackEvent::Ended => self.controller.stop(),
        }
        Ok(PlaybackDecision::Proceed)
    }

    /// Discard the player. The frame loop loses its surfaces with it.
    pub fn unmount(self) {
        self.controller.teardown();
    }
}
