//! Offline ingestion: chunked arXiv records into the vector collection.

use scholar_core::arxiv::{ChunkRecord, PaperPayload};
use scholar_core::config::AppConfig;
use scholar_core::error::AppError;
use sha2::{Digest, Sha256};

use crate::embeddings::Embedder;
use crate::qdrant::{Distance, PointStruct, VectorIndex};

/// Sentinel embedded once before collection setup; its length fixes the
/// collection's vector size.
pub const DIMENSION_PROBE: &str = "dimension probe";

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct IngestStats {
    pub records_read: usize,
    pub points_upserted: usize,
    pub batches_flushed: usize,
    pub skipped_missing_identity: usize,
}

/// Deterministic point identity for an `(arxiv_id, chunk_id)` pair.
///
/// Qdrant accepts only UUIDs or unsigned integers as point ids, so the
/// sha256 digest of a versioned namespace string is truncated to 16 bytes
/// and rendered in UUID form with the version/variant bits pinned.
/// Re-running ingestion reproduces the same id for the same pair.
pub fn point_id(arxiv_id: &str, chunk_id: &str) -> String {
    let digest = Sha256::digest(format!("scholar-point|v1|{arxiv_id}|{chunk_id}").as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    bytes[6] = (bytes[6] & 0x0f) | 0x50;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    let h = hex::encode(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &h[..8],
        &h[8..12],
        &h[12..16],
        &h[16..20],
        &h[20..]
    )
}

/// The text that gets embedded for a chunk: title and abstract are prefixed
/// so short chunks keep paper-level context.
fn doc_text(record: &ChunkRecord) -> String {
    format!(
        "Title: {}\nAbstract: {}\nChunk: {}",
        record.title.as_deref().unwrap_or(""),
        record.summary.as_deref().unwrap_or(""),
        record.chunk.as_deref().unwrap_or(""),
    )
    .trim()
    .to_string()
}

struct PendingPoint {
    id: String,
    doc_text: String,
    payload: serde_json::Value,
}

pub struct IngestPipeline<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    config: &'a AppConfig,
}

impl<'a> IngestPipeline<'a> {
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

    /// Run the pipeline over a stream of records. A failure aborts the
    /// current batch but leaves earlier batches durably indexed; the error
    /// details carry progress so a re-run can resume (deterministic ids
    /// make re-writes harmless).
    pub fn run(
        &self,
        records: impl IntoIterator<Item = Result<ChunkRecord, AppError>>,
    ) -> Result<IngestStats, AppError> {
        let mut stats = IngestStats::default();
        match self.run_inner(records, &mut stats) {
            Ok(()) => {
                tracing::info!(
                    records_read = stats.records_read,
                    points_upserted = stats.points_upserted,
                    batches_flushed = stats.batches_flushed,
                    skipped = stats.skipped_missing_identity,
                    "ingestion complete"
                );
                Ok(stats)
            }
            Err(e) => {
                tracing::error!(
                    records_read = stats.records_read,
                    points_upserted = stats.points_upserted,
                    batches_flushed = stats.batches_flushed,
                    "ingestion aborted"
                );
                Err(e.append_details(format!(
                    "records_read={}; batches_flushed={}; points_upserted={}",
                    stats.records_read, stats.batches_flushed, stats.points_upserted
                )))
            }
        }
    }

    fn run_inner(
        &self,
        records: impl IntoIterator<Item = Result<ChunkRecord, AppError>>,
        stats: &mut IngestStats,
    ) -> Result<(), AppError> {
        // The probe must happen before any collection call: its length fixes
        // the collection's vector size.
        let probe = self.embedder.embed(DIMENSION_PROBE)?;
        let vector_size = probe.len();
        self.setup_collection(vector_size)?;

        let batch_size = self.config.batch_size.max(1);
        let mut buf: Vec<PendingPoint> = Vec::with_capacity(batch_size);

        for record in records {
            let record = record?;
            stats.records_read += 1;

            let Some(arxiv_id) = trimmed(record.id.as_deref()) else {
                stats.skipped_missing_identity += 1;
                tracing::warn!(
                    record = stats.records_read,
                    "skipping record without an arXiv id; no stable point identity"
                );
                continue;
            };
            let Some(chunk_id) = trimmed(record.chunk_id.as_deref()) else {
                stats.skipped_missing_identity += 1;
                tracing::warn!(
                    record = stats.records_read,
                    arxiv_id,
                    "skipping record without a chunk id; no stable point identity"
                );
                continue;
            };

            let payload =
                serde_json::to_value(PaperPayload::from_record(&record)).map_err(|e| {
                    AppError::new("INGEST_DATASET_FAILED", "Failed to encode point payload")
                        .with_details(format!("arxiv_id={arxiv_id}; chunk_id={chunk_id}; err={e}"))
                })?;
            buf.push(PendingPoint {
                id: point_id(arxiv_id, chunk_id),
                doc_text: doc_text(&record),
                payload,
            });

            if buf.len() >= batch_size {
                self.flush(&mut buf, vector_size, stats)?;
            }
        }

        // Final partial batch.
        self.flush(&mut buf, vector_size, stats)
    }

    fn setup_collection(&self, vector_size: usize) -> Result<(), AppError> {
        let name = self.config.collection.as_str();
        if self.config.recreate && self.index.collection_exists(name)? {
            tracing::info!(collection = name, "recreate requested; dropping collection");
            self.index.delete_collection(name)?;
        }
        if !self.index.collection_exists(name)? {
            self.index.create_collection(name, vector_size, Distance::Cosine)?;
        }
        Ok(())
    }

    /// All-or-nothing per batch: one embed call for the buffered doc texts,
    /// one upsert for the whole batch. No point is ever upserted without its
    /// vector.
    fn flush(
        &self,
        buf: &mut Vec<PendingPoint>,
        vector_size: usize,
        stats: &mut IngestStats,
    ) -> Result<(), AppError> {
        if buf.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = buf.iter().map(|p| p.doc_text.clone()).collect();
        let vectors = self.embedder.embed_many(&texts)?;
        if vectors.len() != buf.len() {
            return Err(AppError::new(
                "EMBED_PROTOCOL_MISMATCH",
                "Batch embedding count disagrees with input count",
            )
            .with_details(format!("expected={}; got={}", buf.len(), vectors.len())));
        }

        let mut points = Vec::with_capacity(buf.len());
        for (pending, vector) in buf.iter().zip(vectors) {
            if vector.len() != vector_size {
                return Err(AppError::new(
                    "QDRANT_DIMENSION_MISMATCH",
                    "Embedding length disagrees with the collection vector size",
                )
                .with_details(format!(
                    "expected={vector_size}; got={}; point_id={}",
                    vector.len(),
                    pending.id
                )));
            }
            points.push(PointStruct {
                id: pending.id.clone(),
                vector,
                payload: pending.payload.clone(),
            });
        }

        let count = points.len();
        self.index.upsert(&self.config.collection, points)?;
        buf.clear();
        stats.points_upserted += count;
        stats.batches_flushed += 1;
        tracing::info!(
            batch = stats.batches_flushed,
            points = count,
            total = stats.points_upserted,
            "flushed batch"
        );
        Ok(())
    }
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn point_id_is_deterministic() {
        assert_eq!(point_id("1905.00001", "0"), point_id("1905.00001", "0"));
    }

    #[test]
    fn point_id_distinguishes_pairs() {
        let ids = [
            point_id("1905.00001", "0"),
            point_id("1905.00001", "1"),
            point_id("1905.00002", "0"),
        ];
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[0], ids[2]);
        assert_ne!(ids[1], ids[2]);
    }

    #[test]
    fn point_id_is_uuid_shaped() {
        let id = point_id("1905.00001", "0");
        assert_eq!(id.len(), 36);
        let dashes: Vec<usize> = id
            .char_indices()
            .filter(|(_, c)| *c == '-')
            .map(|(i, _)| i)
            .collect();
        assert_eq!(dashes, vec![8, 13, 18, 23]);
        assert_eq!(id.as_bytes()[14], b'5');
    }

    #[test]
    fn doc_text_concatenates_labelled_sections() {
        let record: ChunkRecord = serde_json::from_str(
            r#"{"id": "a", "chunk-id": "0", "title": "T", "summary": "S", "chunk": "C"}"#,
        )
        .expect("record");
        assert_eq!(doc_text(&record), "Title: T\nAbstract: S\nChunk: C");
    }

    #[test]
    fn doc_text_trims_when_fields_are_absent() {
        let record: ChunkRecord =
            serde_json::from_str(r#"{"id": "a", "chunk-id": "0"}"#).expect("record");
        assert_eq!(doc_text(&record), "Title: \nAbstract: \nChunk:");
    }
}
