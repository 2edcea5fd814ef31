//! Wire shapes for Qdrant's REST API.
//!
//! Plain serde structs matching the documented request/response bodies keep
//! the client SDK-free; the HTTP layer lives in the parent module.

use serde::{Deserialize, Deserializer, Serialize};

/// One point in upsert form: identity, vector, payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointStruct {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

/// Collection distance metric, fixed at creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

/// One search hit: identity, similarity score, stored payload.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScoredPoint {
    #[serde(deserialize_with = "scalar_id")]
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Conjunction of field predicates. An empty conjunction is never sent on
/// the wire: `into_option` yields `None` instead, since Qdrant treats an
/// empty `must` as matching nothing.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Filter {
    must: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field value (treated as a set) must intersect `values`.
    pub fn match_any(mut self, key: impl Into<String>, values: Vec<String>) -> Self {
        self.must.push(Condition {
            key: key.into(),
            r#match: Some(MatchAny { any: values }),
            range: None,
        });
        self
    }

    /// Field value must be >= `bound`.
    pub fn range_gte(mut self, key: impl Into<String>, bound: f64) -> Self {
        self.must.push(Condition {
            key: key.into(),
            r#match: None,
            range: Some(RangeGte { gte: bound }),
        });
        self
    }

    pub fn into_option(self) -> Option<Self> {
        if self.must.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Condition {
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    r#match: Option<MatchAny>,
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<RangeGte>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct MatchAny {
    any: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct RangeGte {
    gte: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct VectorParams {
    pub size: usize,
    pub distance: Distance,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateCollectionBody {
    pub vectors: VectorParams,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UpsertBody {
    pub points: Vec<PointStruct>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SearchBody {
    pub vector: Vec<f32>,
    pub limit: usize,
    pub with_payload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f32>,
}

/// Qdrant wraps every payload in `{"result": ..., "status": ..., "time": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub result: T,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ExistsResult {
    pub exists: bool,
}

// Point ids come back as either strings (UUID) or unsigned integers.
fn scalar_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}
