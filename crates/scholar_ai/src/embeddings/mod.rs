use scholar_core::error::AppError;

mod ollama_embed;

pub use ollama_embed::OllamaEmbedder;

/// Text-to-vector seam. Search and ingestion only ever talk to this trait;
/// tests substitute deterministic implementations.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, AppError>;

    /// Embed a batch of texts. Output order matches input order: vector `i`
    /// belongs to `texts[i]`.
    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Resolve the embed endpoint's response into a single vector.
///
/// The provider answers in one of two shapes: `{"embeddings": [[..]]}`
/// (batch) or `{"embedding": [..]}` (single). Both are handled here once so
/// call sites never see the union. An unrecognized shape fails naming the
/// keys that were actually present; an empty vector is never returned as
/// success.
pub(crate) fn vector_from_response(body: &serde_json::Value) -> Result<Vec<f32>, AppError> {
    if let Some(rows) = body.get("embeddings").and_then(|v| v.as_array()) {
        if let Some(first) = rows.first() {
            return parse_vector(first);
        }
    }
    if let Some(single) = body.get("embedding") {
        return parse_vector(single);
    }

    let keys = match body.as_object() {
        Some(map) => map.keys().cloned().collect::<Vec<_>>().join(","),
        None => format!("non-object response: {body}"),
    };
    Err(AppError::new(
        "EMBED_PROTOCOL_MISMATCH",
        "Embed response carries neither embeddings nor embedding",
    )
    .with_details(format!("keys={keys}")))
}

fn parse_vector(value: &serde_json::Value) -> Result<Vec<f32>, AppError> {
    let vector: Vec<f32> = serde_json::from_value(value.clone()).map_err(|e| {
        AppError::new("EMBED_PROTOCOL_MISMATCH", "Embed response vector is not numeric")
            .with_details(e.to_string())
    })?;
    if vector.is_empty() {
        return Err(AppError::new(
            "EMBED_PROTOCOL_MISMATCH",
            "Embed response vector was empty",
        ));
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn batch_shape_takes_the_first_row() {
        let body = serde_json::json!({"embeddings": [[0.1, 0.2], [0.3, 0.4]]});
        assert_eq!(vector_from_response(&body).expect("vector"), vec![0.1, 0.2]);
    }

    #[test]
    fn single_shape_is_accepted() {
        let body = serde_json::json!({"embedding": [0.5, 0.6, 0.7]});
        assert_eq!(vector_from_response(&body).expect("vector"), vec![0.5, 0.6, 0.7]);
    }

    #[test]
    fn empty_batch_falls_through_to_single_shape() {
        let body = serde_json::json!({"embeddings": [], "embedding": [1.0]});
        assert_eq!(vector_from_response(&body).expect("vector"), vec![1.0]);
    }

    #[test]
    fn unknown_shape_names_the_keys_present() {
        let body = serde_json::json!({"model": "x", "vectors": [[1.0]]});
        let err = vector_from_response(&body).expect_err("must fail");
        assert_eq!(err.code, "EMBED_PROTOCOL_MISMATCH");
        let details = err.details.expect("details");
        assert!(details.contains("model"));
        assert!(details.contains("vectors"));
    }

    #[test]
    fn empty_vector_is_rejected() {
        let body = serde_json::json!({"embedding": []});
        let err = vector_from_response(&body).expect_err("must fail");
        assert_eq!(err.code, "EMBED_PROTOCOL_MISMATCH");
    }

    #[test]
    fn embed_many_preserves_input_order() {
        struct LenEmbedder;
        impl Embedder for LenEmbedder {
            fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
                Ok(vec![text.len() as f32])
            }
        }

        let texts = vec!["a".to_string(), "bbb".to_string(), "cc".to_string()];
        let vectors = LenEmbedder.embed_many(&texts).expect("vectors");
        assert_eq!(vectors, vec![vec![1.0], vec![3.0], vec![2.0]]);
    }
}
