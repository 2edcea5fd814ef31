//! Qdrant collection and point operations over the REST API.

use scholar_core::config::AppConfig;
use scholar_core::error::AppError;

mod wire;

pub use wire::{Distance, Filter, PointStruct, ScoredPoint};

use wire::{ApiResponse, CreateCollectionBody, ExistsResult, SearchBody, UpsertBody, VectorParams};

/// Vector store seam. Ingestion and retrieval only ever talk to this trait;
/// tests substitute in-memory implementations.
pub trait VectorIndex {
    fn collection_exists(&self, name: &str) -> Result<bool, AppError>;

    /// Create a collection with a fixed vector size and distance metric.
    /// Fails with `QDRANT_COLLECTION_EXISTS` when the collection is already
    /// there; callers wanting a fresh start delete it first.
    fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
    ) -> Result<(), AppError>;

    fn delete_collection(&self, name: &str) -> Result<(), AppError>;

    /// Insert-or-overwrite by point id.
    fn upsert(&self, name: &str, points: Vec<PointStruct>) -> Result<(), AppError>;

    /// Nearest-neighbor search, descending score, at most `limit` hits.
    /// `filter` restricts payloads; `score_threshold` drops hits below it.
    fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<Filter>,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredPoint>, AppError>;
}

#[derive(Debug, Clone)]
pub struct QdrantClient {
    base_url: String,
    api_key: Option<String>,
}

impl QdrantClient {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::new(
                "QDRANT_BASE_URL_INVALID",
                "Qdrant base URL must start with http:// or https://",
            )
            .with_details(format!("base_url={base_url}")));
        }
        Ok(Self {
            base_url,
            api_key: api_key.map(|k| k.to_string()),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(&config.qdrant_url, config.qdrant_api_key.as_deref())
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let mut req = ureq::request(method, &format!("{}{path}", self.base_url))
            .timeout(std::time::Duration::from_secs(60));
        if let Some(key) = self.api_key.as_deref() {
            req = req.set("api-key", key);
        }
        req
    }

    fn send<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, AppError> {
        let req = self.request(method, path);
        let resp = match body {
            Some(body) => req.send_json(body),
            None => req.call(),
        };

        match resp {
            Ok(r) => r.into_json::<T>().map_err(|e| {
                AppError::new("QDRANT_REQUEST_FAILED", "Failed to decode Qdrant response")
                    .with_details(format!("path={path}; err={e}"))
            }),
            Err(ureq::Error::Status(status, _)) => Err(
                AppError::new("QDRANT_REQUEST_FAILED", "Qdrant request failed")
                    .with_details(format!("path={path}; status={status}")),
            ),
            Err(e) => Err(AppError::new("QDRANT_REQUEST_FAILED", "Failed to reach Qdrant")
                .with_details(format!("path={path}; err={e}"))
                .with_retryable(true)),
        }
    }

    fn encode(body: impl serde::Serialize) -> Result<serde_json::Value, AppError> {
        serde_json::to_value(body).map_err(|e| {
            AppError::new("QDRANT_REQUEST_FAILED", "Failed to encode Qdrant request")
                .with_details(e.to_string())
        })
    }
}

impl VectorIndex for QdrantClient {
    fn collection_exists(&self, name: &str) -> Result<bool, AppError> {
        let resp: ApiResponse<ExistsResult> =
            self.send("GET", &format!("/collections/{name}/exists"), None)?;
        Ok(resp.result.exists)
    }

    fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
    ) -> Result<(), AppError> {
        let body = Self::encode(CreateCollectionBody {
            vectors: VectorParams {
                size: vector_size,
                distance,
            },
        })?;
        let req = self.request("PUT", &format!("/collections/{name}"));
        match req.send_json(body) {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(409, _)) => Err(AppError::new(
                "QDRANT_COLLECTION_EXISTS",
                "Collection already exists",
            )
            .with_details(format!("collection={name}"))),
            Err(ureq::Error::Status(status, _)) => Err(
                AppError::new("QDRANT_REQUEST_FAILED", "Failed to create collection")
                    .with_details(format!("collection={name}; status={status}")),
            ),
            Err(e) => Err(AppError::new("QDRANT_REQUEST_FAILED", "Failed to reach Qdrant")
                .with_details(format!("collection={name}; err={e}"))
                .with_retryable(true)),
        }
    }

    fn delete_collection(&self, name: &str) -> Result<(), AppError> {
        let _: ApiResponse<serde_json::Value> =
            self.send("DELETE", &format!("/collections/{name}"), None)?;
        Ok(())
    }

    fn upsert(&self, name: &str, points: Vec<PointStruct>) -> Result<(), AppError> {
        let body = Self::encode(UpsertBody { points })?;
        let _: ApiResponse<serde_json::Value> = self.send(
            "PUT",
            &format!("/collections/{name}/points?wait=true"),
            Some(body),
        )?;
        Ok(())
    }

    fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<Filter>,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredPoint>, AppError> {
        let body = Self::encode(SearchBody {
            vector: vector.to_vec(),
            limit,
            with_payload: true,
            filter,
            score_threshold,
        })?;
        let resp: ApiResponse<Vec<ScoredPoint>> = self.send(
            "POST",
            &format!("/collections/{name}/points/search"),
            Some(body),
        )?;
        Ok(resp.result)
    }
}
