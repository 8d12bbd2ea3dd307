//! Per-video detection loop.
//!
//! A [`FrameLoopController`] owns one playback session: it waits for the
//! shared detector, then once per scheduled frame queries the detector,
//! derives the torso angles and redraws the overlay. Only one query is ever in
//! flight per session, and `stop` cancels the next scheduled frame without
//! interrupting a query that is already running.

use crate::{
    config::{Config, References},
    detector::{Detector, DetectorFactory},
    error::Error,
    gateway::DetectorGateway,
    geometry::AnglePair,
    pose::Keypoint,
    render::OverlayRenderer,
    scheduler::FrameScheduler,
    surface::{DrawSurface, VideoSurface},
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Drawing surface shared between the host and the frame loop.
pub type SharedSurface<S> = Arc<Mutex<S>>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopState {
    /// No session and no detector yet.
    Idle,
    /// Waiting for the detector.
    Initializing,
    /// Detector available, not running.
    Ready,
    Running,
    /// Cancelled, last angles retained.
    Stopped,
}

struct Inner<D> {
    state: LoopState,
    detector: Option<Arc<D>>,
    cancel: Option<CancellationToken>,
}

struct Session<F>
where
    F: DetectorFactory,
{
    gateway: Arc<DetectorGateway<F>>,
    scheduler: Arc<dyn FrameScheduler>,
    renderer: OverlayRenderer,
    references: References,
    inner: Mutex<Inner<F::Detector>>,
    angles: watch::Sender<AnglePair>,
}

/// Puts the session back to idle if initialization is abandoned midway.
struct InitializingGuard<'a, F>
where
    F: DetectorFactory,
{
    session: &'a Session<F>,
    armed: bool,
}

impl<F> Drop for InitializingGuard<'_, F>
where
    F: DetectorFactory,
{
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self.session.inner.lock();
            if inner.state == LoopState::Initializing {
                inner.state = LoopState::Idle;
            }
        }
    }
}

pub struct FrameLoopController<F>
where
    F: DetectorFactory,
{
    session: Arc<Session<F>>,
}

impl<F> Clone for FrameLoopController<F>
where
    F: DetectorFactory,
{
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
        }
    }
}

impl<F> FrameLoopController<F>
where
    F: DetectorFactory,
{
    pub fn new(
        gateway: Arc<DetectorGateway<F>>,
        scheduler: Arc<dyn FrameScheduler>,
        config: &Config,
    ) -> Self {
        let (angles, _) = watch::channel(AnglePair::UNAVAILABLE);
        Self {
            session: Arc::new(Session {
                gateway,
                scheduler,
                renderer: OverlayRenderer::new(config),
                references: config.references(),
                inner: Mutex::new(Inner {
                    state: LoopState::Idle,
                    detector: None,
                    cancel: None,
                }),
                angles,
            }),
        }
    }

    pub fn state(&self) -> LoopState {
        self.session.inner.lock().state
    }

    pub fn is_ready(&self) -> bool {
        self.session.inner.lock().detector.is_some()
    }

    pub fn is_initializing(&self) -> bool {
        self.state() == LoopState::Initializing
    }

    pub fn angles(&self) -> AnglePair {
        *self.session.angles.borrow()
    }

    pub fn lean_angle(&self) -> Option<f32> {
        self.angles().lean
    }

    pub fn slope_angle(&self) -> Option<f32> {
        self.angles().slope
    }

    /// Observe angle changes.
    pub fn subscribe_angles(&self) -> watch::Receiver<AnglePair> {
        self.session.angles.subscribe()
    }

    /// Wait for the detector. Does nothing if it is ready or already being
    /// waited for.
    pub async fn initialize(&self) -> Result<(), Error> {
        self.session.initialize().await
    }

    /// Start the frame loop against `video` and `surface`, initializing first
    /// if needed. A loop already running for this controller is cancelled.
    ///
    /// The loop only keeps weak references to both surfaces; once the host
    /// drops them the loop stops drawing.
    #[instrument(name = "FrameLoopController::start", skip_all)]
    pub async fn start<V, S>(&self, video: &Arc<V>, surface: &SharedSurface<S>) -> Result<(), Error>
    where
        V: VideoSurface + 'static,
        S: DrawSurface + Send + 'static,
    {
        // installed before waiting for the detector so a stop in the meantime
        // still reaches this start
        let token = CancellationToken::new();
        if let Some(previous) = self.session.inner.lock().cancel.replace(token.clone()) {
            previous.cancel();
        }

        let detector = match self.session.ready_detector().await {
            Ok(detector) => detector,
            Err(error) => {
                token.cancel();
                return Err(error);
            }
        };

        {
            let mut inner = self.session.inner.lock();
            if token.is_cancelled() {
                debug!(message = "stopped before the frame loop started");
                return Ok(());
            }
            inner.state = LoopState::Running;
        }
        info!(message = "frame loop started", size = ?video.native_size());

        let session = self.session.clone();
        let video = Arc::downgrade(video);
        let surface = Arc::downgrade(surface);
        tokio::spawn(async move { session.run(detector, video, surface, token).await });
        Ok(())
    }

    /// Cancel the next scheduled frame. Angles are kept. Safe to call in any
    /// state, any number of times.
    pub fn stop(&self) {
        let mut inner = self.session.inner.lock();
        if let Some(token) = inner.cancel.take() {
            token.cancel();
        }
        if inner.state == LoopState::Running {
            inner.state = LoopState::Stopped;
            info!(message = "frame loop stopped");
        }
    }

    /// Stop and forget the displayed angles. The detector stays cached.
    pub fn teardown(&self) {
        self.stop();
        self.session.angles.send_replace(AnglePair::UNAVAILABLE);
        let mut inner = self.session.inner.lock();
        if inner.state != LoopState::Initializing {
            inner.state = if inner.detector.is_some() {
                LoopState::Ready
            } else {
                LoopState::Idle
            };
        }
        debug!(message = "frame loop torn down");
    }
}

impl<F> Session<F>
where
    F: DetectorFactory,
{
    async fn initialize(&self) -> Result<(), Error> {
        {
            let mut inner = self.inner.lock();
            if inner.detector.is_some() || inner.state == LoopState::Initializing {
                return Ok(());
            }
            inner.state = LoopState::Initializing;
        }
        let mut guard = InitializingGuard {
            session: self,
            armed: true,
        };

        let result = self.gateway.get_instance().await;
        guard.armed = false;

        let mut inner = self.inner.lock();
        match result {
            Ok(detector) => {
                inner.detector = Some(detector);
                if inner.state == LoopState::Initializing {
                    inner.state = LoopState::Ready;
                }
                info!(message = "pose detector ready");
                Ok(())
            }
            Err(error) => {
                if inner.state == LoopState::Initializing {
                    inner.state = LoopState::Idle;
                }
                error!(message = "pose detector initialization failed", %error);
                Err(error)
            }
        }
    }

    async fn ready_detector(&self) -> Result<Arc<F::Detector>, Error> {
        if let Some(detector) = self.inner.lock().detector.clone() {
            return Ok(detector);
        }
        self.initialize().await?;
        if let Some(detector) = self.inner.lock().detector.clone() {
            return Ok(detector);
        }

        // another caller is initializing, share its construction
        let detector = self.gateway.get_instance().await?;
        self.inner.lock().detector = Some(detector.clone());
        Ok(detector)
    }

    async fn run<V, S>(
        self: Arc<Self>,
        detector: Arc<F::Detector>,
        video: Weak<V>,
        surface: Weak<Mutex<S>>,
        token: CancellationToken,
    ) where
        V: VideoSurface,
        S: DrawSurface,
    {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = self.scheduler.next_frame() => {}
            }

            let video = match video.upgrade() {
                Some(video) => video,
                None => {
                    debug!(message = "video surface dropped, ending frame loop");
                    token.cancel();
                    let mut inner = self.inner.lock();
                    if inner.state == LoopState::Running
                        && inner.cancel.as_ref().map_or(true, CancellationToken::is_cancelled)
                    {
                        inner.cancel = None;
                        inner.state = LoopState::Stopped;
                    }
                    break;
                }
            };

            match self.run_once(&*detector, &*video, &surface, &token).await {
                Ok(()) => {}
                Err(error) if error.is_detached() => {
                    debug!(message = "draw surface gone, frame not drawn");
                }
                Err(error) => warn!(message = "frame skipped", %error),
            }
        }
        debug!(message = "frame loop exited");
    }

    async fn run_once<V, S>(
        &self,
        detector: &F::Detector,
        video: &V,
        surface: &Weak<Mutex<S>>,
        token: &CancellationToken,
    ) -> Result<(), Error>
    where
        V: VideoSurface,
        S: DrawSurface,
    {
        {
            let surface = surface.upgrade().ok_or(Error::SurfaceDetached)?;
            let mut surface = surface.lock();
            let (width, height) = video.native_size();
            if surface.size()? != (width, height) {
                debug!(message = "resizing draw surface", width, height);
                surface.set_size(width, height)?;
            }
        }

        let frame = video.current_frame();
        let timestamp = self.gateway.next_timestamp();
        let detection = detector.detect_for_video(&frame, timestamp).await?;

        // a query that finished after stop still draws, but leaves the angles alone
        if let Some(keypoints) = detection.skeleton() {
            if !token.is_cancelled() {
                self.update_angles(keypoints);
            }
            let surface = surface.upgrade().ok_or(Error::SurfaceDetached)?;
            let mut surface = surface.lock();
            self.renderer.render(&mut *surface, keypoints)
        } else {
            let surface = surface.upgrade().ok_or(Error::SurfaceDetached)?;
            let mut surface = surface.lock();
            surface.clear()
        }
    }

    fn update_angles(&self, keypoints: &[Keypoint]) {
        let update = AnglePair::from_keypoints(keypoints, &self.references);
        self.angles.send_if_modified(|angles| {
            let merged = angles.merged(update);
            let modified = merged != *angles;
            *angles = merged;
            modified
        });
    }
}
