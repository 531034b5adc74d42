use lens_inference::{
    PipelineConfig,
    decode::{DEFAULT_MAX_DIMENSION, DecodeConfig},
    fetch::{DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, FetchConfig},
    labels::DEFAULT_LABELS_URL,
    onnx::{DEFAULT_MODEL_PATH, DEFAULT_MODEL_URL, ModelConfig},
};
use std::{env, path::PathBuf, str::FromStr, time::Duration};

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let model_url = var("MODEL_URL", DEFAULT_MODEL_URL);
        let model = ModelConfig {
            path: PathBuf::from(var("MODEL_PATH", DEFAULT_MODEL_PATH)),
            url: (!model_url.trim().is_empty()).then_some(model_url),
            intra_threads: lookup("MODEL_THREADS")
                .map(|v| parse::<usize>("MODEL_THREADS", &v))
                .transpose()?,
        };

        let fetch = FetchConfig {
            user_agent: var("IMAGE_USER_AGENT", DEFAULT_USER_AGENT),
            timeout: Duration::from_secs(parse(
                "FETCH_TIMEOUT_SECS",
                &var("FETCH_TIMEOUT_SECS", &DEFAULT_TIMEOUT.as_secs().to_string()),
            )?),
            max_bytes: parse(
                "MAX_IMAGE_BYTES",
                &var("MAX_IMAGE_BYTES", &DEFAULT_MAX_BYTES.to_string()),
            )?,
        };

        let decode = DecodeConfig {
            max_dimension: parse(
                "MAX_IMAGE_DIMENSION",
                &var("MAX_IMAGE_DIMENSION", &DEFAULT_MAX_DIMENSION.to_string()),
            )?,
        };

        Ok(Config {
            port: parse("PORT", &var("PORT", "9000"))?,
            database_url: var("DATABASE_URL", "sqlite://lens.db?mode=rwc"),
            pipeline: PipelineConfig {
                labels_source: var("LABELS_SOURCE", DEFAULT_LABELS_URL),
                model,
                fetch,
                decode,
            },
        })
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(var) => write!(f, "Invalid value for: {}", var),
        }
    }
}

impl std::error::Error for ConfigError {}
