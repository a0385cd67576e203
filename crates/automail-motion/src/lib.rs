//! Orientation tracking and motion features for the automail prosthesis.
//!
//! Takes the canonical samples produced by `automail-sensors` and derives
//! what the activity classifier consumes: a corrected orientation relative
//! to a resting pose, and a one-second motion delta over accelerometer and
//! flex readings.

pub mod classifier;
pub mod flex;
pub mod orientation;
pub mod window;

pub use classifier::{Classifier, FitClassifier, Label, TrainingSet};
pub use flex::FlexCalibration;
pub use orientation::{axis_angle, quat_to_euler, EulerAngles, OrientationModel};
pub use window::{FeatureVector, SampleWindow, DEFAULT_WINDOW_SECONDS, FEATURE_DIM};
