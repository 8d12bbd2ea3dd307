//! A detector that answers from a recorded landmark file.
//!
//! The model artifact is a JSON-lines file, one record per line:
//!
//! ```text
//! {"time_ms": 0, "landmarks": [[0.51, 0.12, 0.98], ...]}
//! ```
//!
//! Each landmark is `[x, y, visibility]`. A record with no landmarks marks a
//! stretch of video where nobody is in frame. A query returns the record in
//! effect at the frame's media time.

use crate::{
    detector::{Detector, DetectorFactory, DetectorOptions, RunningMode},
    error::Error,
    pose::{Detection, Keypoint, WorldKeypoint},
    surface::VideoFrame,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument};

#[derive(Debug, Deserialize)]
struct LandmarkRecord {
    time_ms: u64,
    #[serde(default)]
    landmarks: Vec<[f32; 3]>,
    #[serde(default)]
    world_landmarks: Vec<[f32; 4]>,
}

impl LandmarkRecord {
    fn into_detection(self, min_presence: f32) -> Result<(Duration, Detection), Error> {
        let time = Duration::from_millis(self.time_ms);
        if self.landmarks.is_empty() {
            return Ok((time, Detection::empty()));
        }
        let keypoints = self
            .landmarks
            .iter()
            .map(|&[x, y, visibility]| Keypoint::new(x, y, visibility))
            .collect::<Result<Vec<_>, _>>()?;

        // skeletons the detector would not have been confident in are dropped
        let presence =
            keypoints.iter().map(|k| k.visibility).sum::<f32>() / keypoints.len() as f32;
        if presence < min_presence {
            return Ok((time, Detection::empty()));
        }

        let world = self
            .world_landmarks
            .iter()
            .map(|&[x, y, z, visibility]| WorldKeypoint { x, y, z, visibility })
            .collect::<Vec<_>>();
        Ok((
            time,
            Detection {
                landmarks: vec![keypoints],
                world_landmarks: if world.is_empty() { Vec::new() } else { vec![world] },
            },
        ))
    }
}

/// Parse a landmark recording, requiring strictly increasing record times.
fn parse_recording(content: &str, min_presence: f32) -> Result<Vec<(Duration, Detection)>, Error> {
    let mut records: Vec<(Duration, Detection)> = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line_number = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        let record: LandmarkRecord = serde_json::from_str(line)
            .map_err(|e| Error::ParseLandmarkRecord(e, line_number))?;
        let (time, detection) = record.into_detection(min_presence)?;
        if records.last().map_or(false, |(previous, _)| *previous >= time) {
            return Err(Error::UnorderedLandmarkRecord(line_number));
        }
        records.push((time, detection));
    }
    Ok(records)
}

pub struct ReplayDetector {
    records: Vec<(Duration, Detection)>,
    last_timestamp: Mutex<Option<Duration>>,
}

impl ReplayDetector {
    fn new(records: Vec<(Duration, Detection)>) -> Self {
        Self {
            records,
            last_timestamp: Mutex::new(None),
        }
    }

    /// Media time of the last record.
    pub fn duration(&self) -> Duration {
        self.records.last().map_or(Duration::ZERO, |(time, _)| *time)
    }

    fn detection_at(&self, media_time: Duration) -> Detection {
        let index = self
            .records
            .partition_point(|(time, _)| *time <= media_time);
        index
            .checked_sub(1)
            .map_or_else(Detection::empty, |i| self.records[i].1.clone())
    }
}

#[async_trait]
impl Detector for ReplayDetector {
    async fn detect_for_video(
        &self,
        frame: &VideoFrame,
        timestamp: Duration,
    ) -> Result<Detection, Error> {
        {
            let mut last = self.last_timestamp.lock();
            if let Some(previous) = *last {
                if timestamp <= previous {
                    return Err(Error::TimestampOutOfOrder {
                        previous,
                        got: timestamp,
                    });
                }
            }
            *last = Some(timestamp);
        }
        Ok(self.detection_at(frame.media_time))
    }
}

/// Builds a [`ReplayDetector`] from the configured model artifact.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplayFactory;

#[async_trait]
impl DetectorFactory for ReplayFactory {
    type Detector = ReplayDetector;

    #[instrument(name = "ReplayFactory::create", skip_all)]
    async fn create(&self, options: &DetectorOptions) -> Result<ReplayDetector, Error> {
        if options.num_poses != 1 {
            return Err(Error::UnsupportedPoseCount(options.num_poses));
        }
        if let Some(assets) = &options.runtime_assets {
            if tokio::fs::metadata(assets).await.is_err() {
                return Err(Error::MissingRuntimeAssets(assets.clone()));
            }
        }
        if options.running_mode != RunningMode::Video {
            debug!(message = "replay ignores running mode", running_mode = ?options.running_mode);
        }

        let content = tokio::fs::read_to_string(&options.model_asset)
            .await
            .map_err(|e| Error::ReadModelAsset(e, options.model_asset.clone()))?;
        let records = parse_recording(&content, options.min_pose_detection_confidence)?;
        info!(
            message = "loaded landmark recording",
            path = ?options.model_asset,
            records = records.len(),
        );
        Ok(ReplayDetector::new(records))
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_recording, ReplayDetector, ReplayFactory};
    use crate::{
        config::DetectorConfig,
        detector::{Detector, DetectorFactory, DetectorOptions},
        error::Error,
        surface::VideoFrame,
    };
    use std::time::Duration;

    fn record(time_ms: u64, visibility: f32) -> String {
        let landmarks = (0..33)
            .map(|i| format!("[{}, 0.5, {}]", i as f32 / 33.0, visibility))
            .collect::<Vec<_>>()
            .join(",");
        format!(r#"{{"time_ms": {time_ms}, "landmarks": [{landmarks}]}}"#)
    }

    fn frame(media_ms: u64) -> VideoFrame {
        VideoFrame {
            width: 10,
            height: 10,
            media_time: Duration::from_millis(media_ms),
            pixels: None,
        }
    }

    fn detector(content: &str) -> ReplayDetector {
        ReplayDetector::new(parse_recording(content, 0.5).unwrap())
    }

    #[test]
    fn parses_records_and_gaps() {
        let content = [record(0, 0.9), r#"{"time_ms": 100}"#.to_string(), String::new()].join("\n");
        let records = parse_recording(&content, 0.5).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].1.skeleton().map(<[_]>::len), Some(33));
        assert!(records[1].1.skeleton().is_none());
    }

    #[test]
    fn unconfident_skeletons_are_dropped() {
        let records = parse_recording(&record(0, 0.2), 0.5).unwrap();
        assert!(records[0].1.skeleton().is_none());
    }

    #[test]
    fn rejects_bad_records() {
        assert!(matches!(
            parse_recording("{not json", 0.5),
            Err(Error::ParseLandmarkRecord(_, 1))
        ));
        let unordered = [record(100, 0.9), record(100, 0.9)].join("\n");
        assert!(matches!(
            parse_recording(&unordered, 0.5),
            Err(Error::UnorderedLandmarkRecord(2))
        ));
    }

    #[tokio::test]
    async fn answers_with_record_in_effect() {
        let content = [record(100, 0.9), r#"{"time_ms": 200}"#.to_string()].join("\n");
        let detector = detector(&content);
        assert_eq!(detector.duration(), Duration::from_millis(200));

        let before = detector
            .detect_for_video(&frame(50), Duration::from_millis(1))
            .await
            .unwrap();
        assert!(before.skeleton().is_none());

        let during = detector
            .detect_for_video(&frame(150), Duration::from_millis(2))
            .await
            .unwrap();
        assert!(during.skeleton().is_some());

        let after = detector
            .detect_for_video(&frame(250), Duration::from_millis(3))
            .await
            .unwrap();
        assert!(after.skeleton().is_none());
    }

    #[tokio::test]
    async fn repeated_timestamps_are_rejected() {
        let detector = detector(&record(0, 0.9));
        detector
            .detect_for_video(&frame(0), Duration::from_millis(5))
            .await
            .unwrap();
        let result = detector
            .detect_for_video(&frame(0), Duration::from_millis(5))
            .await;
        assert!(matches!(result, Err(Error::TimestampOutOfOrder { .. })));
    }

    #[tokio::test]
    async fn missing_model_asset_fails_construction() {
        let mut config = DetectorConfig::default();
        config.model_asset = "does/not/exist.jsonl".into();
        let result = ReplayFactory.create(&DetectorOptions::from(&config)).await;
        assert!(matches!(result, Err(Error::ReadModelAsset(..))));
    }

    #[tokio::test]
    async fn loads_recording_from_disk() {
        let path = std::env::temp_dir().join(format!("slope-pose-{}.jsonl", std::process::id()));
        std::fs::write(&path, record(0, 0.9)).unwrap();
        let mut config = DetectorConfig::default();
        config.model_asset = path.clone();
        let detector = ReplayFactory
            .create(&DetectorOptions::from(&config))
            .await
            .unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(detector.duration(), Duration::ZERO);
    }
}
