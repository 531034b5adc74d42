/// # ONNX Runtime Classifier
/// ResNet-style 1x3x224x224 -> 1xN logits models.
use crate::engine::{Classifier, NUM_CLASSES, ProbabilityDistribution};
use crate::error::{InferenceError, StartupError};
use crate::preprocess::PreprocessedTensor;
use ndarray::Axis;
use ort::{
    inputs,
    session::{Session, builder::GraphOptimizationLevel},
    value::Value,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL_PATH: &str = "models/resnet50-v2-7.onnx";
pub const DEFAULT_MODEL_URL: &str = "https://github.com/onnx/models/raw/main/validated/vision/classification/resnet/model/resnet50-v2-7.onnx";

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub path: PathBuf,
    /// Downloaded into `path` when the file is missing
    pub url: Option<String>,
    pub intra_threads: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
            url: Some(DEFAULT_MODEL_URL.to_string()),
            intra_threads: None,
        }
    }
}

pub struct OnnxClassifier {
    // `Session::run` needs exclusive access; inference never mutates weights.
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    num_classes: usize,
}

impl OnnxClassifier {
    pub async fn load(config: &ModelConfig, client: &reqwest::Client) -> Result<Self, StartupError> {
        let fail = |message: String| StartupError::Model {
            path: config.path.display().to_string(),
            message,
        };

        if !config.path.exists() {
            let url = config
                .url
                .as_deref()
                .ok_or_else(|| fail("model file missing and no download URL configured".into()))?;
            download_model(url, &config.path, client)
                .await
                .map_err(fail)?;
        }

        let classifier = Self::from_file(&config.path, config.intra_threads)
            .map_err(|e| fail(e.to_string()))?;
        tracing::info!(
            "Loaded model {} (input: {}, output: {}, classes: {})",
            config.path.display(),
            classifier.input_name,
            classifier.output_name,
            classifier.num_classes
        );
        Ok(classifier)
    }

    pub fn from_file(path: &Path, intra_threads: Option<usize>) -> ort::Result<Self> {
        let mut builder = Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;
        if let Some(threads) = intra_threads {
            builder = builder.with_intra_threads(threads)?;
        }
        let session = builder.commit_from_file(path)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "data".to_string());
        let output = session.outputs.first();
        let output_name = output
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "output".to_string());
        // Dynamic or missing dims fall back to ImageNet; `infer` checks the real length.
        let num_classes = output
            .and_then(|o| o.output_type.tensor_shape())
            .and_then(|shape| shape.iter().last().copied())
            .filter(|&d| d > 0)
            .map(|d| d as usize)
            .unwrap_or(NUM_CLASSES);

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            num_classes,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn infer(&self, tensor: &PreprocessedTensor) -> Result<ProbabilityDistribution, InferenceError> {
        if !tensor.is_finite() {
            return Err(InferenceError::NonFinite("input tensor"));
        }

        let batch = tensor.as_array().view().insert_axis(Axis(0)).to_owned();
        let value = Value::from_array(batch)?;

        let logits: Vec<f32> = {
            let mut session = self.session.lock();
            let outputs = session.run(inputs![self.input_name.as_str() => value])?;
            let output = outputs[self.output_name.as_str()].try_extract_array::<f32>()?;
            output.iter().copied().collect()
        };

        if logits.len() != self.num_classes {
            return Err(InferenceError::Shape {
                expected: self.num_classes,
                actual: logits.len(),
            });
        }
        ProbabilityDistribution::from_logits(&logits)
    }
}

async fn download_model(url: &str, path: &Path, client: &reqwest::Client) -> Result<(), String> {
    tracing::info!("Downloading model from {} to {}", url, path.display());
    let response = client.get(url).send().await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("model download failed: HTTP {}", response.status()));
    }
    let bytes = response.bytes().await.map_err(|e| e.to_string())?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }
    // A partial download never lands at `path`.
    let partial = path.with_extension("part");
    tokio::fs::write(&partial, &bytes)
        .await
        .map_err(|e| e.to_string())?;
    tokio::fs::rename(&partial, path)
        .await
        .map_err(|e| e.to_string())?;
    tracing::info!("Downloaded model ({} bytes)", bytes.len());
    Ok(())
}
