use scholar_core::config::AppConfig;
use scholar_core::error::AppError;
use serde::Serialize;

use crate::ollama::OllamaClient;

use super::{vector_from_response, Embedder};

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Ok(Self::new(
            OllamaClient::from_config(config)?,
            config.embed_model.clone(),
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let input = text.trim();
        if input.is_empty() {
            return Err(AppError::new(
                "EMBED_INVALID_INPUT",
                "Embedding input must not be empty",
            ));
        }

        let url = format!("{}/api/embed", self.client.base_url());
        let req = EmbedRequest {
            model: &self.model,
            input,
        };
        let resp = ureq::post(&url)
            .timeout(std::time::Duration::from_secs(60))
            .send_json(serde_json::to_value(req).map_err(|e| {
                AppError::new("EMBED_REQUEST_FAILED", "Failed to encode embed request")
                    .with_details(e.to_string())
            })?);

        match resp {
            Ok(r) if r.status() == 200 => {
                let body: serde_json::Value = r.into_json().map_err(|e| {
                    AppError::new("EMBED_REQUEST_FAILED", "Failed to decode embed response")
                        .with_details(e.to_string())
                })?;
                vector_from_response(&body)
            }
            Ok(r) => Err(
                AppError::new("EMBED_REQUEST_FAILED", "Embed request failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(ureq::Error::Status(status, _)) => Err(
                AppError::new("EMBED_REQUEST_FAILED", "Embed request failed")
                    .with_details(format!("status={status}")),
            ),
            Err(e) => Err(
                AppError::new("EMBED_REQUEST_FAILED", "Failed to call embed endpoint")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_rejected_before_any_network_call() {
        let client = OllamaClient::new("http://127.0.0.1:1").expect("client");
        let embedder = OllamaEmbedder::new(client, "test-model");
        let err = embedder.embed("   \n  ").expect_err("must fail");
        assert_eq!(err.code, "EMBED_INVALID_INPUT");
    }
}
