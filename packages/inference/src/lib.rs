//! Image classification pipeline.
//!
//! A URL goes in, the five most likely ImageNet labels come out:
//! [`fetch`] -> [`decode`] -> [`preprocess`] -> [`engine`] -> [`rank`],
//! sequenced by [`pipeline::Pipeline`]. The label table and the model are
//! loaded once by [`pipeline::Pipeline::bootstrap`] and only read afterwards.

pub mod decode;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod labels;
pub mod onnx;
pub mod pipeline;
pub mod preprocess;
pub mod rank;

pub use engine::{Classifier, ProbabilityDistribution};
pub use error::{
    ConfigurationError, DecodeError, FetchError, InferenceError, PipelineError, StartupError,
};
pub use labels::LabelTable;
pub use pipeline::{Pipeline, PipelineConfig};
pub use preprocess::PreprocessedTensor;
pub use rank::{Prediction, PredictionResult};
