use std::collections::BTreeMap;

use crate::error::AppError;

/// Process-wide configuration, constructed once at startup and passed by
/// reference into each component. Components never read the environment
/// themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Qdrant base URL, no trailing slash.
    pub qdrant_url: String,
    /// Optional Qdrant API key, sent as the `api-key` header.
    pub qdrant_api_key: Option<String>,
    /// Collection holding the indexed paper chunks.
    pub collection: String,
    /// Ollama base URL, no trailing slash.
    pub ollama_url: String,
    /// Embedding model name.
    pub embed_model: String,
    /// Default minimum similarity score; 0 means no threshold.
    pub score_threshold: f32,
    /// Records buffered per embed+upsert flush.
    pub batch_size: usize,
    /// Drop and recreate the collection before ingesting.
    pub recreate: bool,
    /// Ingest at most this many records from the bulk source.
    pub limit: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6333".to_string(),
            qdrant_api_key: None,
            collection: "scholar_arxiv".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text:latest".to_string(),
            score_threshold: 0.0,
            batch_size: 64,
            recreate: false,
            limit: Some(20_000),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let vars: BTreeMap<String, String> = std::env::vars().collect();
        Self::from_overrides(&vars)
    }

    /// Apply recognized keys from an explicit map over the defaults.
    pub fn from_overrides(vars: &BTreeMap<String, String>) -> Result<Self, AppError> {
        let mut cfg = Self::default();
        if let Some(v) = nonempty(vars, "QDRANT_URL") {
            cfg.qdrant_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = nonempty(vars, "QDRANT_API_KEY") {
            cfg.qdrant_api_key = Some(v);
        }
        if let Some(v) = nonempty(vars, "QDRANT_COLLECTION") {
            cfg.collection = v;
        }
        if let Some(v) = nonempty(vars, "OLLAMA_BASE_URL") {
            cfg.ollama_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = nonempty(vars, "OLLAMA_EMBED_MODEL") {
            cfg.embed_model = v;
        }
        if let Some(v) = nonempty(vars, "SCHOLAR_SCORE_THRESHOLD") {
            cfg.score_threshold = v.parse::<f32>().map_err(|e| {
                AppError::new("CONFIG_INVALID", "Failed to parse SCHOLAR_SCORE_THRESHOLD")
                    .with_details(format!("value={v}; err={e}"))
            })?;
            if !cfg.score_threshold.is_finite() || cfg.score_threshold < 0.0 {
                return Err(AppError::new(
                    "CONFIG_INVALID",
                    "SCHOLAR_SCORE_THRESHOLD must be a finite non-negative number",
                )
                .with_details(format!("value={v}")));
            }
        }
        Ok(cfg)
    }
}

fn nonempty(vars: &BTreeMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_service_conventions() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.qdrant_url, "http://localhost:6333");
        assert_eq!(cfg.collection, "scholar_arxiv");
        assert_eq!(cfg.ollama_url, "http://localhost:11434");
        assert_eq!(cfg.embed_model, "nomic-embed-text:latest");
        assert_eq!(cfg.score_threshold, 0.0);
        assert_eq!(cfg.batch_size, 64);
        assert!(!cfg.recreate);
    }

    #[test]
    fn overrides_apply_and_trim_trailing_slashes() {
        let mut vars = BTreeMap::new();
        vars.insert("QDRANT_URL".to_string(), "http://qdrant:6333/".to_string());
        vars.insert("QDRANT_COLLECTION".to_string(), "papers".to_string());
        vars.insert("OLLAMA_BASE_URL".to_string(), "http://ollama:11434/".to_string());
        vars.insert("SCHOLAR_SCORE_THRESHOLD".to_string(), "0.72".to_string());

        let cfg = AppConfig::from_overrides(&vars).expect("config");
        assert_eq!(cfg.qdrant_url, "http://qdrant:6333");
        assert_eq!(cfg.collection, "papers");
        assert_eq!(cfg.ollama_url, "http://ollama:11434");
        assert_eq!(cfg.score_threshold, 0.72);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let mut vars = BTreeMap::new();
        vars.insert("QDRANT_COLLECTION".to_string(), "   ".to_string());
        let cfg = AppConfig::from_overrides(&vars).expect("config");
        assert_eq!(cfg.collection, "scholar_arxiv");
    }

    #[test]
    fn bad_threshold_is_a_config_error() {
        let mut vars = BTreeMap::new();
        vars.insert("SCHOLAR_SCORE_THRESHOLD".to_string(), "high".to_string());
        let err = AppConfig::from_overrides(&vars).expect_err("must fail");
        assert_eq!(err.code, "CONFIG_INVALID");

        let mut vars = BTreeMap::new();
        vars.insert("SCHOLAR_SCORE_THRESHOLD".to_string(), "-0.5".to_string());
        let err = AppConfig::from_overrides(&vars).expect_err("must fail");
        assert_eq!(err.code, "CONFIG_INVALID");
    }
}
