//! Agent-facing boundary: the search operation as one JSON callable.

use scholar_core::error::AppError;
use serde::Deserialize;

use crate::retrieve::{ScholarSearch, SearchRequest};

pub const TOOL_NAME: &str = "scholar_search";

const DEFAULT_TOP_K: usize = 5;
const MAX_TOP_K: usize = 50;

// Tool inputs are untrusted: unknown fields are rejected rather than
// silently ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ToolArgs {
    query: String,
    top_k: Option<usize>,
    category: Option<String>,
    year_from: Option<i32>,
    score_threshold: Option<f32>,
}

/// Tool descriptor for registration with an agent runtime.
pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": TOOL_NAME,
        "description": "Search the local arXiv vector index and return top papers as evidence.",
        "parameters": {
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural-language search query."
                },
                "top_k": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_TOP_K,
                    "default": DEFAULT_TOP_K,
                    "description": "Maximum number of papers to return."
                },
                "category": {
                    "type": "string",
                    "description": "Restrict to an arXiv category, e.g. cs.CL."
                },
                "year_from": {
                    "type": "integer",
                    "description": "Only papers published in or after this year."
                },
                "score_threshold": {
                    "type": "number",
                    "description": "Minimum similarity score; 0 disables the threshold."
                }
            },
            "required": ["query"]
        }
    })
}

/// Decode untrusted call arguments, run the search, and return the evidence
/// records as a JSON array.
pub fn invoke(
    search: &ScholarSearch<'_>,
    args: &serde_json::Value,
) -> Result<serde_json::Value, AppError> {
    let args: ToolArgs = serde_json::from_value(args.clone()).map_err(|e| {
        AppError::new("TOOL_ARGS_INVALID", "Failed to decode tool arguments")
            .with_details(e.to_string())
    })?;

    let request = SearchRequest {
        query: args.query,
        top_k: args.top_k.unwrap_or(DEFAULT_TOP_K).clamp(1, MAX_TOP_K),
        category: args.category,
        year_from: args.year_from,
        score_threshold: args.score_threshold,
    };

    let records = search.search(&request)?;
    serde_json::to_value(records).map_err(|e| {
        AppError::new("TOOL_RESULT_FAILED", "Failed to encode tool result")
            .with_details(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_the_query_argument() {
        let schema = schema();
        assert_eq!(schema["name"], TOOL_NAME);
        assert_eq!(
            schema["parameters"]["required"],
            serde_json::json!(["query"])
        );
    }
}
