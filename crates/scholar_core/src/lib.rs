pub mod arxiv;
pub mod config;
pub mod error;
