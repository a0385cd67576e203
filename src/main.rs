use anyhow::Result;
use automail_config::TransportMode;
use automail_motion::classifier::{Classifier, FitClassifier, Label, TrainingSet};
use automail_motion::orientation::OrientationModel;
use automail_motion::window::{FeatureVector, SampleWindow};
use automail_sensors::{Sensors, SensorSample};
use std::time::Instant;
use tracing::{debug, info};

/// Stand-in for the trained activity model: labels a tick as moving (1) or
/// resting (0) by the magnitude of the motion delta. A real model plugs in
/// through the same [`Classifier`] port.
struct MotionThreshold {
    threshold: f64,
}

impl Default for MotionThreshold {
    fn default() -> Self {
        Self { threshold: 1.0 }
    }
}

impl Classifier for MotionThreshold {
    fn predict(&self, feature: &FeatureVector) -> Result<Label> {
        Ok(if feature.magnitude() >= self.threshold {
            1
        } else {
            0
        })
    }
}

impl FitClassifier for MotionThreshold {
    /// "Fit" the threshold to the mean delta magnitude of the training set.
    fn fit(training: &TrainingSet) -> Result<Self> {
        if training.is_empty() {
            return Ok(Self::default());
        }
        let mean = training
            .iter()
            .map(|(feature, _)| feature.magnitude())
            .sum::<f64>()
            / training.len() as f64;
        Ok(Self { threshold: mean })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "automail=info,automail_sensors=info,automail_motion=info".into()
            }),
        )
        .init();

    info!("automail telemetry core starting");

    let config = automail_config::load_config();

    // A transport we cannot open is the one startup failure that is fatal.
    let mut sensors = match config.transport.mode {
        TransportMode::Serial => Sensors::serial(
            config.transport.serial_device.as_deref(),
            config.transport.baud_rate,
        )?,
        TransportMode::Net => Sensors::net(config.transport.udp_port)?,
    };

    // Fitting runs once at startup; with no recorded dataset on hand the
    // stand-in model falls back to its default threshold.
    let classifier = MotionThreshold::fit(&TrainingSet::new())?;

    run_loop(&mut sensors, &classifier, config.window_seconds)
}

/// Orientation, window, and clock state threaded through the loop.
struct LoopState {
    model: OrientationModel,
    window: SampleWindow,
    started: Option<Instant>,
}

impl LoopState {
    fn new() -> Self {
        Self {
            model: OrientationModel::new(SensorSample::zero(Instant::now())),
            window: SampleWindow::new(),
            started: None,
        }
    }

    /// Fold one sample into the loop state. Returns a label whenever a full
    /// lookback window has elapsed; classifier failures propagate unmodified.
    fn ingest(
        &mut self,
        sample: SensorSample,
        classifier: &dyn Classifier,
        window_seconds: f64,
    ) -> Result<Option<Label>> {
        // The elapsed clock starts at the first successful read.
        let first_tick = self.started.is_none();
        let start = *self.started.get_or_insert_with(Instant::now);
        let elapsed = start.elapsed().as_secs_f64();

        self.model.update(sample);
        if first_tick {
            // The pose held when data first arrives is the resting
            // reference; corrected orientation reads as identity there.
            self.model.recenter(None);
            info!("Resting pose captured from first sample");
        }
        self.window.push(sample, elapsed);

        match self.window.maybe_extract(window_seconds) {
            Some(feature) => Ok(Some(classifier.predict(&feature)?)),
            None => Ok(None),
        }
    }
}

/// The synchronous read/decode/feature/predict loop. Classifier errors are
/// the only thing that escapes it.
fn run_loop(
    sensors: &mut Sensors,
    classifier: &dyn Classifier,
    window_seconds: f64,
) -> Result<()> {
    let mut state = LoopState::new();
    let mut tick_count: u64 = 0;

    loop {
        // A tick with no usable frame keeps the previous sample and state.
        let Some(sample) = sensors.read() else {
            continue;
        };

        if let Some(label) = state.ingest(sample, classifier, window_seconds)? {
            let euler = state.model.euler();
            info!(
                label,
                pitch = euler.pitch,
                roll = euler.roll,
                yaw = euler.yaw,
                flex = sample.flex,
                "Prediction"
            );
        }

        tick_count += 1;
        if tick_count % 1000 == 0 {
            debug!(tick_count, %sample, "Sensor heartbeat");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DQuat, EulerRot};

    #[test]
    fn first_sample_becomes_resting_pose() {
        let clf = MotionThreshold::default();
        let mut state = LoopState::new();

        let mut sample = SensorSample::zero(Instant::now());
        sample.gyro = DQuat::from_euler(EulerRot::ZYX, 0.5, 0.2, -0.3);
        state.ingest(sample, &clf, 1.0).unwrap();

        // The very first pose is the resting reference, so corrected
        // orientation reads as identity there.
        let corrected = state.model.corrected();
        assert!((corrected.w.abs() - 1.0).abs() < 1e-9);
        assert!(corrected.x.abs() < 1e-9);
        assert!(corrected.y.abs() < 1e-9);
        assert!(corrected.z.abs() < 1e-9);

        // Later poses read relative to it; no re-recentering happens.
        let mut moved = sample;
        moved.gyro = DQuat::from_euler(EulerRot::ZYX, 1.5, 0.2, -0.3);
        state.ingest(moved, &clf, 1.0).unwrap();
        assert!(!state.model.corrected().abs_diff_eq(DQuat::IDENTITY, 1e-6));
    }

    #[test]
    fn threshold_splits_rest_from_motion() {
        let clf = MotionThreshold { threshold: 2.0 };
        let still = FeatureVector([0.1, 0.1, 0.0, 0.0]);
        let moving = FeatureVector([3.0, 0.0, 4.0, 0.0]);
        assert_eq!(clf.predict(&still).unwrap(), 0);
        assert_eq!(clf.predict(&moving).unwrap(), 1);
    }

    #[test]
    fn fit_uses_mean_training_magnitude() {
        let mut set = TrainingSet::new();
        set.push(FeatureVector([3.0, 0.0, 4.0, 0.0]), 1); // magnitude 5
        set.push(FeatureVector([1.0, 0.0, 0.0, 0.0]), 0); // magnitude 1
        let clf = MotionThreshold::fit(&set).unwrap();
        assert!((clf.threshold - 3.0).abs() < 1e-12);
    }

    #[test]
    fn fit_on_empty_set_falls_back_to_default() {
        let clf = MotionThreshold::fit(&TrainingSet::new()).unwrap();
        assert_eq!(clf.threshold, MotionThreshold::default().threshold);
    }
}
