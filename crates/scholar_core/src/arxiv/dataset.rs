//! Streaming JSON-lines reader for the chunked arXiv dump.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::error::AppError;

use super::ChunkRecord;

/// Iterates records from a JSONL file, stopping after an optional cap.
/// Blank lines are skipped; a malformed line aborts with its line number.
#[derive(Debug)]
pub struct ChunkRecordReader {
    lines: Lines<BufReader<File>>,
    path: String,
    line_no: usize,
    remaining: Option<usize>,
}

impl ChunkRecordReader {
    pub fn open(path: &Path, limit: Option<usize>) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::new("INGEST_DATASET_FAILED", "Failed to open dataset file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            path: path.display().to_string(),
            line_no: 0,
            remaining: limit,
        })
    }
}

impl Iterator for ChunkRecordReader {
    type Item = Result<ChunkRecord, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(AppError::new(
                        "INGEST_DATASET_FAILED",
                        "Failed to read dataset line",
                    )
                    .with_details(format!("path={}; line={}; err={}", self.path, self.line_no + 1, e))));
                }
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            return Some(serde_json::from_str::<ChunkRecord>(&line).map_err(|e| {
                AppError::new("INGEST_DATASET_FAILED", "Failed to decode dataset record")
                    .with_details(format!("path={}; line={}; err={}", self.path, self.line_no, e))
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_dataset(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        for line in lines {
            writeln!(file, "{line}").expect("write");
        }
        file
    }

    #[test]
    fn reads_records_and_skips_blank_lines() {
        let file = write_dataset(&[
            r#"{"id": "1905.00001", "chunk-id": "0", "chunk": "first"}"#,
            "",
            r#"{"id": "1905.00001", "chunk-id": "1", "chunk": "second"}"#,
        ]);
        let records: Vec<_> = ChunkRecordReader::open(file.path(), None)
            .expect("open")
            .collect::<Result<_, _>>()
            .expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].chunk_id.as_deref(), Some("1"));
    }

    #[test]
    fn limit_caps_the_record_count() {
        let file = write_dataset(&[
            r#"{"id": "a", "chunk-id": "0"}"#,
            r#"{"id": "a", "chunk-id": "1"}"#,
            r#"{"id": "a", "chunk-id": "2"}"#,
        ]);
        let records: Vec<_> = ChunkRecordReader::open(file.path(), Some(2))
            .expect("open")
            .collect::<Result<_, _>>()
            .expect("records");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn malformed_line_reports_its_position() {
        let file = write_dataset(&[r#"{"id": "a", "chunk-id": "0"}"#, "not json"]);
        let mut reader = ChunkRecordReader::open(file.path(), None).expect("open");
        assert!(reader.next().expect("first").is_ok());
        let err = reader.next().expect("second").expect_err("must fail");
        assert_eq!(err.code, "INGEST_DATASET_FAILED");
        assert!(err.details.as_deref().expect("details").contains("line=2"));
    }

    #[test]
    fn missing_file_is_a_dataset_error() {
        let err = ChunkRecordReader::open(Path::new("/nonexistent/records.jsonl"), None)
            .expect_err("must fail");
        assert_eq!(err.code, "INGEST_DATASET_FAILED");
    }
}
