/// # Ranker
/// Top-k selection joined against the label table.
use crate::engine::ProbabilityDistribution;
use crate::error::ConfigurationError;
use crate::labels::LabelTable;
use serde::Serialize;

pub const TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    #[serde(skip)]
    pub class_id: usize,
    pub label: String,
    pub probability: f32,
}

/// Descending by probability, length `TOP_K` for full-size distributions
pub type PredictionResult = Vec<Prediction>;

pub fn rank(
    dist: &ProbabilityDistribution,
    labels: &LabelTable,
) -> Result<PredictionResult, ConfigurationError> {
    labels.ensure_len(dist.len())?;

    let mut indexed: Vec<(usize, f32)> = dist.as_slice().iter().copied().enumerate().collect();
    // Stable sort: equal probabilities keep ascending class ID.
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(indexed
        .into_iter()
        .take(TOP_K)
        .filter_map(|(class_id, probability)| {
            labels.get(class_id).map(|label| Prediction {
                class_id,
                label: label.to_string(),
                probability,
            })
        })
        .collect())
}
