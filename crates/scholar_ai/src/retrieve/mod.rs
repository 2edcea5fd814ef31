//! Paper-level semantic search over the chunk index.

use std::collections::BTreeMap;

use scholar_core::config::AppConfig;
use scholar_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::embeddings::Embedder;
use crate::qdrant::{Filter, ScoredPoint, VectorIndex};

/// Evidence snippets are bounded to this many characters.
pub const SNIPPET_MAX_CHARS: usize = 800;

// Chunks of the same paper compete for the same slots, so raw hits are
// over-fetched; dedup then still fills top_k papers.
const OVERFETCH_FACTOR: usize = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    pub category: Option<String>,
    pub year_from: Option<i32>,
    pub score_threshold: Option<f32>,
}

/// One paper surfaced as evidence, at most one per arXiv id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceRecord {
    pub score: f32,
    pub title: String,
    pub arxiv_id: String,
    pub url: Option<String>,
    pub snippet: String,
    pub categories: serde_json::Value,
    pub published: serde_json::Value,
}

pub struct ScholarSearch<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    config: &'a AppConfig,
}

impl<'a> ScholarSearch<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        index: &'a dyn VectorIndex,
        config: &'a AppConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// Embed the query, search the collection, and return at most `top_k`
    /// papers ordered by descending score.
    ///
    /// An empty query (or `top_k == 0`) is a valid no-op: it returns an
    /// empty result without touching the network.
    pub fn search(&self, request: &SearchRequest) -> Result<Vec<EvidenceRecord>, AppError> {
        let query = request.query.trim();
        if query.is_empty() || request.top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query)?;
        let filter = build_filter(request.category.as_deref(), request.year_from);
        let limit = request.top_k.saturating_mul(OVERFETCH_FACTOR).max(request.top_k);
        let threshold = request
            .score_threshold
            .unwrap_or(self.config.score_threshold);
        let effective = (threshold > 0.0).then_some(threshold);

        let mut hits = self.index.search(
            &self.config.collection,
            &vector,
            limit,
            filter.clone(),
            effective,
        )?;

        // An over-aggressive threshold must not silently return nothing:
        // retry once without it. An explicit zero threshold never retries.
        if hits.is_empty() && effective.is_some() {
            tracing::debug!(threshold, "threshold yielded no hits; retrying without it");
            hits = self
                .index
                .search(&self.config.collection, &vector, limit, filter, None)?;
        }

        // One hit per paper, keeping the best-scoring chunk. Equal scores
        // keep the lexicographically smaller point id so the outcome does
        // not depend on backend ordering.
        let mut best: BTreeMap<String, ScoredPoint> = BTreeMap::new();
        for hit in hits {
            let Some(arxiv_id) = paper_id(&hit.payload) else {
                tracing::debug!(point_id = %hit.id, "dropping hit without a paper identifier");
                continue;
            };
            let keep = match best.get(&arxiv_id) {
                None => true,
                Some(prev) => {
                    hit.score > prev.score || (hit.score == prev.score && hit.id < prev.id)
                }
            };
            if keep {
                best.insert(arxiv_id, hit);
            }
        }

        let mut kept: Vec<(String, ScoredPoint)> = best.into_iter().collect();
        kept.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        kept.truncate(request.top_k);

        Ok(kept
            .into_iter()
            .map(|(arxiv_id, hit)| evidence_record(arxiv_id, &hit))
            .collect())
    }
}

fn build_filter(category: Option<&str>, year_from: Option<i32>) -> Option<Filter> {
    let mut filter = Filter::new();
    if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
        filter = filter.match_any("categories", vec![category.to_string()]);
    }
    if let Some(year) = year_from {
        filter = filter.range_gte("year", f64::from(year));
    }
    filter.into_option()
}

/// Paper identity of a hit: `arxiv_id`, falling back to a generic `id`
/// payload field. Hits with neither cannot be deduplicated and are dropped.
fn paper_id(payload: &serde_json::Value) -> Option<String> {
    for key in ["arxiv_id", "id"] {
        match payload.get(key) {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                return Some(s.trim().to_string());
            }
            Some(serde_json::Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn evidence_record(arxiv_id: String, hit: &ScoredPoint) -> EvidenceRecord {
    let payload = &hit.payload;
    let title = string_field(payload, "title")
        .or_else(|| string_field(payload, "paper_title"))
        .unwrap_or_default();
    EvidenceRecord {
        score: hit.score,
        title,
        url: Some(format!("https://arxiv.org/abs/{arxiv_id}")),
        snippet: extract_snippet(payload, SNIPPET_MAX_CHARS),
        categories: payload
            .get("categories")
            .cloned()
            .unwrap_or(serde_json::Value::Null),
        published: payload
            .get("published")
            .cloned()
            .unwrap_or(serde_json::Value::Null),
        arxiv_id,
    }
}

fn string_field(payload: &serde_json::Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Pull a usable excerpt out of a payload: first non-empty candidate field
/// in priority order, coerced to text if needed, newlines collapsed, bounded
/// to `max_chars`.
fn extract_snippet(payload: &serde_json::Value, max_chars: usize) -> String {
    for key in ["chunk", "text", "summary", "abstract"] {
        let Some(value) = payload.get(key) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let candidate = match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        };
        let cleaned = candidate.replace('\n', " ").trim().to_string();
        if cleaned.is_empty() {
            continue;
        }
        return cleaned.chars().take(max_chars).collect();
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn snippet_prefers_chunk_then_falls_back_in_order() {
        let payload = serde_json::json!({"chunk": "from chunk", "summary": "from summary"});
        assert_eq!(extract_snippet(&payload, 800), "from chunk");

        let payload = serde_json::json!({"chunk": "", "summary": "from summary"});
        assert_eq!(extract_snippet(&payload, 800), "from summary");

        let payload = serde_json::json!({"abstract": "from abstract"});
        assert_eq!(extract_snippet(&payload, 800), "from abstract");

        let payload = serde_json::json!({"comment": "unrelated"});
        assert_eq!(extract_snippet(&payload, 800), "");
    }

    #[test]
    fn snippet_is_bounded_and_newline_collapsed() {
        let summary = "x".repeat(2000);
        let payload = serde_json::json!({"chunk": "", "summary": summary});
        let snippet = extract_snippet(&payload, SNIPPET_MAX_CHARS);
        assert_eq!(snippet.chars().count(), 800);

        let payload = serde_json::json!({"chunk": "line one\nline two\nline three"});
        assert_eq!(extract_snippet(&payload, 800), "line one line two line three");
    }

    #[test]
    fn snippet_coerces_non_textual_values() {
        let payload = serde_json::json!({"chunk": 42});
        assert_eq!(extract_snippet(&payload, 800), "42");
    }

    #[test]
    fn filter_is_absent_when_no_predicate_applies() {
        assert_eq!(build_filter(None, None), None);
        assert_eq!(build_filter(Some("  "), None), None);
        assert!(build_filter(Some("cs.CL"), None).is_some());
        assert!(build_filter(None, Some(2020)).is_some());
    }

    #[test]
    fn paper_id_falls_back_to_generic_id() {
        assert_eq!(
            paper_id(&serde_json::json!({"arxiv_id": "1905.00001"})).as_deref(),
            Some("1905.00001")
        );
        assert_eq!(
            paper_id(&serde_json::json!({"arxiv_id": "", "id": "2001.00002"})).as_deref(),
            Some("2001.00002")
        );
        assert_eq!(paper_id(&serde_json::json!({"id": 7})).as_deref(), Some("7"));
        assert_eq!(paper_id(&serde_json::json!({"title": "t"})), None);
    }
}
