//! Record and payload model for the chunked arXiv bulk source.

use serde::{Deserialize, Deserializer, Serialize};
use time::format_description;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};

pub mod dataset;

pub use dataset::ChunkRecordReader;

/// One row of the chunked arXiv dump. Every field is optional: rows with
/// gaps must still deserialize so the pipeline can decide what to do with
/// them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    /// arXiv identifier, e.g. "1905.00001".
    #[serde(default, deserialize_with = "scalar_string")]
    pub id: Option<String>,
    /// Chunk identifier, unique within a paper. Numeric in some dumps.
    #[serde(default, rename = "chunk-id", deserialize_with = "scalar_string")]
    pub chunk_id: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub authors: Option<Vec<String>>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub primary_category: Option<String>,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    /// PDF URL; the dump calls this column "source".
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Payload stored with each indexed point. Known keys are always present in
/// the serialized form: absent values serialize as explicit nulls so
/// consumers can rely on key presence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PaperPayload {
    pub arxiv_id: Option<String>,
    pub chunk_id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub categories: Option<Vec<String>>,
    pub primary_category: Option<String>,
    pub authors: Option<Vec<String>>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub pdf_url: Option<String>,
    pub comment: Option<String>,
    /// Publication year derived from `published`; the year-range search
    /// filter ranges over this field.
    pub year: Option<i32>,
}

impl PaperPayload {
    pub fn from_record(record: &ChunkRecord) -> Self {
        Self {
            arxiv_id: record.id.clone(),
            chunk_id: record.chunk_id.clone(),
            title: record.title.clone(),
            summary: record.summary.clone(),
            categories: record.categories.clone(),
            primary_category: record.primary_category.clone(),
            authors: record.authors.clone(),
            published: record.published.clone(),
            updated: record.updated.clone(),
            pdf_url: record.source.clone(),
            comment: record.comment.clone(),
            year: record.published.as_deref().and_then(year_from_published),
        }
    }
}

/// Derive a publication year from a `published` timestamp.
///
/// Deterministic allowlist only, no fuzzy parsing: RFC3339, then a plain
/// `YYYY-MM-DD` date, then a leading run of four digits (covers compact
/// `YYYYMMDD` stamps). Anything else yields `None`.
pub fn year_from_published(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(dt.year());
    }

    if let Ok(items) = format_description::parse("[year]-[month]-[day]") {
        if let Ok(date) = Date::parse(trimmed, &items) {
            return Some(date.year());
        }
    }

    let head: String = trimmed.chars().take(4).collect();
    if head.len() == 4 && head.chars().all(|c| c.is_ascii_digit()) {
        return head.parse::<i32>().ok().filter(|y| (1000..=9999).contains(y));
    }

    None
}

// Some dumps carry numeric chunk ids; accept any scalar and render it as a
// string so identity derivation sees one canonical form.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn year_from_published_allowlist() {
        assert_eq!(year_from_published("2019-05-01T00:00:00+00:00"), Some(2019));
        assert_eq!(year_from_published("2023-04-19"), Some(2023));
        assert_eq!(year_from_published("20210403"), Some(2021));
        assert_eq!(year_from_published("  2019-05-01T00:00:00Z "), Some(2019));
        assert_eq!(year_from_published("unknown"), None);
        assert_eq!(year_from_published(""), None);
        assert_eq!(year_from_published("05/01/2019"), None);
    }

    #[test]
    fn numeric_chunk_id_is_coerced_to_string() {
        let record: ChunkRecord =
            serde_json::from_str(r#"{"id": "1905.00001", "chunk-id": 3}"#).expect("record");
        assert_eq!(record.chunk_id.as_deref(), Some("3"));
    }

    #[test]
    fn payload_serializes_absent_fields_as_explicit_nulls() {
        let record: ChunkRecord =
            serde_json::from_str(r#"{"id": "1905.00001", "chunk-id": "0"}"#).expect("record");
        let value = serde_json::to_value(PaperPayload::from_record(&record)).expect("value");
        let object = value.as_object().expect("object");

        for key in [
            "arxiv_id",
            "chunk_id",
            "title",
            "summary",
            "categories",
            "primary_category",
            "authors",
            "published",
            "updated",
            "pdf_url",
            "comment",
            "year",
        ] {
            assert!(object.contains_key(key), "missing key {key}");
        }
        assert!(object["title"].is_null());
        assert!(object["comment"].is_null());
        assert_eq!(object["arxiv_id"], "1905.00001");
    }

    #[test]
    fn payload_carries_derived_year() {
        let record: ChunkRecord = serde_json::from_str(
            r#"{"id": "1905.00001", "chunk-id": "0", "published": "2019-05-01T00:00:00+00:00"}"#,
        )
        .expect("record");
        let payload = PaperPayload::from_record(&record);
        assert_eq!(payload.year, Some(2019));
    }
}
