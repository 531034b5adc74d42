//! # Pipeline Orchestrator
//! fetch -> decode -> preprocess -> infer -> rank. The fetch is the only await point;
//! everything after it runs on the blocking pool.
use crate::decode::{self, DecodeConfig};
use crate::engine::Classifier;
use crate::error::{InferenceError, PipelineError, StartupError};
use crate::fetch::{FetchConfig, ImageFetcher};
use crate::labels::{DEFAULT_LABELS_URL, LabelTable};
use crate::onnx::{ModelConfig, OnnxClassifier};
use crate::preprocess;
use crate::rank::{self, PredictionResult};
use std::sync::Arc;

/// Everything needed to bring the pipeline up at process start
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub labels_source: String,
    pub model: ModelConfig,
    pub fetch: FetchConfig,
    pub decode: DecodeConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            labels_source: DEFAULT_LABELS_URL.to_string(),
            model: ModelConfig::default(),
            fetch: FetchConfig::default(),
            decode: DecodeConfig::default(),
        }
    }
}

pub struct Pipeline {
    fetcher: ImageFetcher,
    decode: DecodeConfig,
    labels: Arc<LabelTable>,
    classifier: Arc<dyn Classifier>,
}

impl Pipeline {
    pub fn new(
        fetcher: ImageFetcher,
        decode: DecodeConfig,
        labels: Arc<LabelTable>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            fetcher,
            decode,
            labels,
            classifier,
        }
    }

    /// Load labels and model exactly once. Any error here must stop the process.
    pub async fn bootstrap(config: &PipelineConfig) -> Result<Self, StartupError> {
        let fetcher = ImageFetcher::new(&config.fetch)?;
        // Startup downloads are large and not bound by the per-request timeout.
        let startup_client = reqwest::Client::builder()
            .user_agent(config.fetch.user_agent.as_str())
            .build()
            .map_err(|e| StartupError::Client(e.to_string()))?;

        let labels = LabelTable::load(&config.labels_source, &startup_client).await?;
        let classifier = OnnxClassifier::load(&config.model, &startup_client).await?;
        labels.ensure_len(classifier.num_classes())?;

        Ok(Self::new(
            fetcher,
            config.decode,
            Arc::new(labels),
            Arc::new(classifier),
        ))
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    #[tracing::instrument(name = "predict", skip(self))]
    pub async fn predict(&self, url: &str) -> Result<PredictionResult, PipelineError> {
        let fetched = self.fetcher.fetch(url).await?;

        let decode_config = self.decode;
        let labels = Arc::clone(&self.labels);
        let classifier = Arc::clone(&self.classifier);
        let span = tracing::Span::current();

        // Decode, resize and model evaluation are CPU bound; keep them off the async workers.
        let results = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            classify(&fetched.bytes, &decode_config, &labels, classifier.as_ref())
        })
        .await
        .map_err(|e| InferenceError::Runtime(format!("classification task failed: {e}")))??;

        if let Some(top) = results.first() {
            tracing::info!("Top-1: {} ({:.4})", top.label, top.probability);
        }
        Ok(results)
    }
}

fn classify(
    bytes: &[u8],
    decode_config: &DecodeConfig,
    labels: &LabelTable,
    classifier: &dyn Classifier,
) -> Result<PredictionResult, PipelineError> {
    let image = decode::decode(bytes, decode_config)?;
    tracing::debug!("Decoded {}x{} image", image.width(), image.height());

    let tensor = preprocess::preprocess(&image);
    drop(image);

    let dist = classifier.infer(&tensor)?;
    Ok(rank::rank(&dist, labels)?)
}
