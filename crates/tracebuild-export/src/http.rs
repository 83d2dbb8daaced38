//! OTLP/HTTP adapter: POSTs the typed export request as OTLP/JSON.

use crate::gateway::{SpanExporter, EXPORT_TIMEOUT};
use crate::otlp;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tracebuild_core::{user_agent, ConfigError, ExportError, ExporterConfig, Span};

pub struct HttpSpanExporter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSpanExporter {
    pub fn new(config: &ExporterConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent())
                .map_err(|_| ConfigError::InvalidHeaderValue("User-Agent".into()))?,
        );
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| ConfigError::InvalidHeaderName(key.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ConfigError::InvalidHeaderValue(key.clone()))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(EXPORT_TIMEOUT)
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ConfigError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl SpanExporter for HttpSpanExporter {
    async fn export(&self, batch: &[Span]) -> Result<(), ExportError> {
        let request = otlp::encode_request(batch);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExportError::Timeout
                } else {
                    ExportError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ExportError::Transport(format!(
                "unexpected response status {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "otlp-http"
    }
}
