/// # Image Fetcher
/// Single GET per request, no retries. Every failure surfaces as `FetchError`.
use crate::error::{FetchError, StartupError};
use bytes::{Bytes, BytesMut};
use reqwest::{StatusCode, header::CONTENT_TYPE};
use std::time::Duration;

/// Many image hosts refuse requests without a browser-like agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_MAX_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    /// Whole-request timeout; expiry is reported as a transport fault
    pub timeout: Duration,
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Raw response body that passed status and content-type validation
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl ImageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, StartupError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| StartupError::Client(e.to_string()))?;
        Ok(Self {
            client,
            max_bytes: config.max_bytes,
        })
    }

    #[tracing::instrument(name = "fetch_image", skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image") {
            return Err(FetchError::NotAnImage(content_type));
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes)
        {
            return Err(FetchError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!("Fetched {} bytes ({})", body.len(), content_type);
        Ok(FetchedImage {
            content_type,
            bytes: body.freeze(),
        })
    }
}
