use crate::{
    detector::{DetectorFactory, DetectorOptions},
    error::Error,
};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, info, instrument, warn};

type Construction<D> = Shared<BoxFuture<'static, Result<Arc<D>, Arc<Error>>>>;

struct Slot<D> {
    /// Bumped whenever `pending` is dropped, so waiters on an old construction
    /// never clear a newer one.
    generation: u64,
    pending: Option<Construction<D>>,
}

/// Detector timestamps in whole milliseconds, strictly increasing.
struct DetectionClock {
    origin: Instant,
    last: Option<Duration>,
}

impl DetectionClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            last: None,
        }
    }

    fn next(&mut self) -> Duration {
        let now = Duration::from_millis(self.origin.elapsed().as_millis() as u64);
        let timestamp = match self.last {
            Some(last) if now <= last => last + Duration::from_millis(1),
            _ => now,
        };
        self.last = Some(timestamp);
        timestamp
    }
}

/// Owner of the process-wide detector instance.
///
/// The first call to [`DetectorGateway::get_instance`] starts construction and
/// every caller, concurrent or later, shares that single construction. The
/// gateway also hands out the detection timestamps, so every session querying
/// the shared detector stays in one increasing sequence.
pub struct DetectorGateway<F>
where
    F: DetectorFactory,
{
    factory: Arc<F>,
    options: DetectorOptions,
    slot: Mutex<Slot<F::Detector>>,
    clock: Mutex<DetectionClock>,
}

impl<F> DetectorGateway<F>
where
    F: DetectorFactory,
{
    pub fn new(factory: F, options: DetectorOptions) -> Self {
        Self {
            factory: Arc::new(factory),
            options,
            slot: Mutex::new(Slot {
                generation: 0,
                pending: None,
            }),
            clock: Mutex::new(DetectionClock::new()),
        }
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    fn construct(&self) -> Construction<F::Detector> {
        let factory = self.factory.clone();
        let options = self.options.clone();
        async move {
            info!(
                message = "creating pose detector",
                model_asset = ?options.model_asset,
                num_poses = options.num_poses,
            );
            factory
                .create(&options)
                .await
                .map(Arc::new)
                .map_err(Arc::new)
        }
        .boxed()
        .shared()
    }

    /// Get the detector, creating it if this is the first request.
    ///
    /// A failed construction is forgotten, so the next call tries again.
    #[instrument(name = "DetectorGateway::get_instance", skip(self), level = "debug")]
    pub async fn get_instance(&self) -> Result<Arc<F::Detector>, Error> {
        let (generation, construction) = {
            let mut slot = self.slot.lock();
            let generation = slot.generation;
            let construction = match &slot.pending {
                Some(construction) => construction.clone(),
                None => {
                    debug!(message = "starting detector construction", generation);
                    let construction = self.construct();
                    slot.pending = Some(construction.clone());
                    construction
                }
            };
            (generation, construction)
        };

        match construction.await {
            Ok(detector) => Ok(detector),
            Err(error) => {
                let mut slot = self.slot.lock();
                if slot.generation == generation {
                    warn!(message = "detector construction failed", %error);
                    slot.pending = None;
                    slot.generation += 1;
                }
                Err(Error::CreateDetector(error))
            }
        }
    }

    /// Whether a detector has been constructed and is cached.
    pub fn is_ready(&self) -> bool {
        self.slot
            .lock()
            .pending
            .as_ref()
            .and_then(Shared::peek)
            .map_or(false, Result::is_ok)
    }

    /// Timestamp for the next detector query, later than any handed out before
    /// by this gateway.
    pub fn next_timestamp(&self) -> Duration {
        self.clock.lock().next()
    }

    /// Forget the cached detector or pending construction.
    ///
    /// Callers already awaiting the old construction still get its outcome.
    pub fn reset(&self) {
        let mut slot = self.slot.lock();
        slot.pending = None;
        slot.generation += 1;
        debug!(message = "detector gateway reset", generation = slot.generation);
    }
}
