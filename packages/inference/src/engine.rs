/// # Inference Engine
/// A loaded, read-only classification model. Implementations are shared across requests.
use crate::error::InferenceError;
use crate::preprocess::PreprocessedTensor;

pub const NUM_CLASSES: usize = 1000;

/// Softmax output indexed by class ID
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityDistribution(Vec<f32>);

impl ProbabilityDistribution {
    /// Normalize raw class scores.
    pub fn from_logits(logits: &[f32]) -> Result<Self, InferenceError> {
        if logits.iter().any(|v| !v.is_finite()) {
            return Err(InferenceError::NonFinite("model output"));
        }
        Ok(Self(softmax(logits)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

/// Evaluation-mode classifier. `infer` must not mutate model parameters.
pub trait Classifier: Send + Sync {
    /// Length of every distribution this classifier returns
    fn num_classes(&self) -> usize;

    fn infer(&self, tensor: &PreprocessedTensor) -> Result<ProbabilityDistribution, InferenceError>;
}
