use crate::window::FeatureVector;
use anyhow::Result;

/// Activity identifier the classifier emits (0 = resting in observed use).
pub type Label = i32;

/// Offline labelled feature vectors for fitting a model at startup.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    features: Vec<FeatureVector>,
    labels: Vec<Label>,
}

impl TrainingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, feature: FeatureVector, label: Label) {
        self.features.push(feature);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FeatureVector, Label)> {
        self.features.iter().zip(self.labels.iter().copied())
    }
}

/// The activity-classifier port.
///
/// The model behind it is an external collaborator: this crate only supplies
/// validated 4-component feature vectors and expects a label back. Errors
/// propagate to the caller unmodified; misclassification is an application
/// concern, not a protocol one.
pub trait Classifier {
    fn predict(&self, feature: &FeatureVector) -> Result<Label>;
}

/// Classifiers that can be fitted from an offline training set. Invoked once
/// at startup, never on the per-tick hot path.
pub trait FitClassifier: Classifier + Sized {
    fn fit(training: &TrainingSet) -> Result<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Always(Label);

    impl Classifier for Always {
        fn predict(&self, _feature: &FeatureVector) -> Result<Label> {
            Ok(self.0)
        }
    }

    #[test]
    fn training_set_pairs_features_with_labels() {
        let mut set = TrainingSet::new();
        set.push(FeatureVector([1.0, 0.0, 0.0, 0.0]), 1);
        set.push(FeatureVector([0.0, 0.0, 0.0, 0.0]), 0);
        assert_eq!(set.len(), 2);
        let labels: Vec<Label> = set.iter().map(|(_, l)| l).collect();
        assert_eq!(labels, vec![1, 0]);
    }

    #[test]
    fn port_is_object_safe() {
        let clf: Box<dyn Classifier> = Box::new(Always(3));
        let label = clf.predict(&FeatureVector([0.0; 4])).unwrap();
        assert_eq!(label, 3);
    }
}
