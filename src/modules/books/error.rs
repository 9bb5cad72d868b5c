use std::fmt;

use catalog_http::error::AppError;
use thiserror::Error;

/// Field rule failures in rule order, displayed joined by `", "`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn new(messages: Vec<String>) -> Self {
        Self(messages)
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn into_messages(self) -> Vec<String> {
        self.0
    }

    pub fn contains(&self, message: &str) -> bool {
        self.0.iter().any(|m| m == message)
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

/// Reasons the catalog refuses a create or update.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(Violations),

    #[error("Book with ISBN {isbn} already exists")]
    Conflict { isbn: String },
}

impl CatalogError {
    pub fn conflict(isbn: impl Into<String>) -> Self {
        Self::Conflict { isbn: isbn.into() }
    }
}

impl From<Violations> for CatalogError {
    fn from(violations: Violations) -> Self {
        Self::Validation(violations)
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::Validation(violations) => {
                AppError::validation(violations.into_messages(), message)
            }
            CatalogError::Conflict { .. } => AppError::conflict(message),
        }
    }
}
