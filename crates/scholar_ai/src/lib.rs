pub mod embeddings;
pub mod ingest;
pub mod ollama;
pub mod qdrant;
pub mod retrieve;
pub mod tool;
