use serde::{Deserialize, Serialize};
use std::fmt;

/// Single structured error shape used across all layers and exposed over the
/// tool/CLI JSON boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Append to existing details instead of replacing them. Used to carry
    /// progress context through a propagated failure.
    pub fn append_details(mut self, extra: impl Into<String>) -> Self {
        let extra = extra.into();
        self.details = Some(match self.details.take() {
            Some(d) => format!("{d}; {extra}"),
            None => extra,
        });
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = self.details.as_deref() {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
