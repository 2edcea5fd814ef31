use scholar_core::config::AppConfig;
use scholar_core::error::AppError;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
}

impl OllamaClient {
    /// Create a client for Ollama. The base URL must be a bare http(s)
    /// origin; API paths are appended here.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::new(
                "OLLAMA_BASE_URL_INVALID",
                "Ollama base URL must start with http:// or https://",
            )
            .with_details(format!("base_url={base_url}")));
        }
        if base_url.ends_with("/api") || base_url.contains("/api/") {
            return Err(AppError::new(
                "OLLAMA_BASE_URL_INVALID",
                "Ollama base URL must not include an API path",
            )
            .with_details(format!("base_url={base_url}")));
        }

        Ok(Self { base_url })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(&config.ollama_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url)
            .timeout(std::time::Duration::from_millis(800))
            .call();

        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(
                AppError::new("OLLAMA_UNHEALTHY", "Ollama health check failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(ureq::Error::Status(status, _)) => Err(
                AppError::new("OLLAMA_UNHEALTHY", "Ollama health check failed")
                    .with_details(format!("status={status}")),
            ),
            Err(e) => Err(AppError::new("OLLAMA_UNREACHABLE", "Failed to reach Ollama")
                .with_details(e.to_string())
                .with_retryable(true)),
        }
    }
}
