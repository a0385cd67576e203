use automail_sensors::SensorSample;
use std::collections::VecDeque;

/// Components in a classifier feature vector: accelerometer x/y/z deltas
/// plus the flex delta. Gyro components are excluded from the feature.
pub const FEATURE_DIM: usize = 4;

/// Lookback used for the motion delta unless configured otherwise.
pub const DEFAULT_WINDOW_SECONDS: f64 = 1.0;

/// Motion-delta feature handed to the classifier: the elementwise difference
/// between the current sample and the sample from one window ago.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_DIM]);

impl FeatureVector {
    /// Difference `current - earlier` over the classifier-facing components.
    pub fn delta(current: &SensorSample, earlier: &SensorSample) -> Self {
        Self([
            current.accel.x - earlier.accel.x,
            current.accel.y - earlier.accel.y,
            current.accel.z - earlier.accel.z,
            current.flex - earlier.flex,
        ])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Euclidean magnitude of the delta, a crude overall-motion measure.
    pub fn magnitude(&self) -> f64 {
        self.0.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

struct WindowEntry {
    elapsed: f64,
    sample: SensorSample,
}

/// Time-ordered FIFO of recent samples.
///
/// Entries arrive in elapsed-time order, oldest at the head. A feature is
/// only ever derived from an evicted head entry, and at most one entry is
/// evicted per call — one feature per tick is the cadence the classifier
/// expects, so there is no catch-up draining of stale entries.
#[derive(Default)]
pub struct SampleWindow {
    entries: VecDeque<WindowEntry>,
}

impl SampleWindow {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Append a sample taken at `elapsed` seconds to the tail.
    pub fn push(&mut self, sample: SensorSample, elapsed: f64) {
        debug_assert!(
            self.entries.back().map_or(true, |e| e.elapsed <= elapsed),
            "window entries must be pushed in time order"
        );
        self.entries.push_back(WindowEntry { elapsed, sample });
    }

    /// Pop the head and return the motion delta against the newest entry,
    /// but only once the head has aged past `window_seconds`.
    pub fn maybe_extract(&mut self, window_seconds: f64) -> Option<FeatureVector> {
        let newest = self.entries.back()?;
        let oldest = self.entries.front()?;
        if newest.elapsed - oldest.elapsed < window_seconds {
            return None;
        }
        let current = newest.sample;
        let popped = self.entries.pop_front()?;
        Some(FeatureVector::delta(&current, &popped.sample))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
