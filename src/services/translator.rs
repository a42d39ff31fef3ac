use async_trait::async_trait;

use crate::config::TranslatorConfig;
use crate::vocabulary::{Language, RemoteTranslator, TranslatorError};

/// Client for the public Google translate endpoint (`client=gtx`).
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    config: TranslatorConfig,
    client: reqwest::Client,
}

impl GoogleTranslator {
    pub fn new(config: &TranslatorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config: config.clone(),
            client,
        }
    }

    async fn request(
        &self,
        source: Language,
        target: Language,
        text: &str,
    ) -> Result<String, TranslatorError> {
        let response = self
            .client
            .get(&self.config.api_url)
            .query(&[
                ("client", "gtx"),
                ("sl", source.remote_code()),
                ("tl", target.remote_code()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranslatorError::ApiError {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let body: serde_json::Value = response.json().await.map_err(map_request_error)?;
        parse_segments(&body)
    }
}

fn map_request_error(e: reqwest::Error) -> TranslatorError {
    if e.is_timeout() {
        TranslatorError::Timeout
    } else if e.is_decode() {
        TranslatorError::InvalidResponse(e.to_string())
    } else {
        TranslatorError::Network(e.to_string())
    }
}

/// 响应形如 `[[["译文", "原文", ...], ...], ...]`，拼接所有片段的译文
fn parse_segments(body: &serde_json::Value) -> Result<String, TranslatorError> {
    let segments = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| TranslatorError::InvalidResponse("missing segment list".to_string()))?;

    Ok(segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|t| t.as_str()))
        .collect())
}

#[async_trait]
impl RemoteTranslator for GoogleTranslator {
    async fn translate_batch(
        &self,
        source: Language,
        target: Language,
        text: &str,
    ) -> Result<String, TranslatorError> {
        if !self.config.enabled {
            return Err(TranslatorError::Disabled);
        }
        if self.config.mock || source == target {
            return Ok(text.to_string());
        }

        let started = std::time::Instant::now();
        let result = self.request(source, target, text).await;
        match &result {
            Ok(_) => tracing::debug!(
                target_language = target.iso_code(),
                chars = text.len(),
                latency_ms = started.elapsed().as_millis() as u64,
                "Translation batch completed"
            ),
            Err(e) => tracing::warn!(
                target_language = target.iso_code(),
                error = %e,
                "Translation batch failed"
            ),
        }
        result
    }
}
