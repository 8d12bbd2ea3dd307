use crate::surface::{VideoFrame, VideoSurface};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Clock {
    elapsed: Duration,
    playing_since: Option<Instant>,
}

/// A video of fixed native size without pixels, whose media time advances
/// with wall-clock time while playing.
#[derive(Debug)]
pub struct SyntheticVideo {
    width: u32,
    height: u32,
    clock: Mutex<Clock>,
}

impl SyntheticVideo {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            clock: Mutex::new(Clock::default()),
        }
    }

    pub fn play(&self) {
        let mut clock = self.clock.lock();
        if clock.playing_since.is_none() {
            clock.playing_since = Some(Instant::now());
        }
    }

    pub fn pause(&self) {
        let mut clock = self.clock.lock();
        if let Some(since) = clock.playing_since.take() {
            clock.elapsed += since.elapsed();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.clock.lock().playing_since.is_some()
    }
}

impl VideoSurface for SyntheticVideo {
    fn native_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn current_time(&self) -> Duration {
        let clock = self.clock.lock();
        clock.elapsed + clock.playing_since.map_or(Duration::ZERO, |since| since.elapsed())
    }

    fn current_frame(&self) -> VideoFrame {
        VideoFrame {
            width: self.width,
            height: self.height,
            media_time: self.current_time(),
            pixels: None,
        }
    }
}
