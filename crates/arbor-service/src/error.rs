use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use arbor_db::error::DbError;

/// Service layer errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    DatabaseError(#[from] DbError),

    #[error(transparent)]
    CoreError(#[from] arbor_core::error::CoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// A deployment mistake, never a user error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Human readable messages keyed by the request field they concern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for `field`. The first message for a field wins.
    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_insert_with(|| message.into());
    }

    /// ## Summary
    /// Files a tree validation failure under `field` and reports whether the check passed.
    ///
    /// ## Errors
    /// Failures other than tree validation are propagated unchanged.
    pub fn collect(&mut self, field: &str, outcome: Result<(), DbError>) -> ServiceResult<bool> {
        match outcome {
            Ok(()) => Ok(true),
            Err(DbError::Tree(err)) => {
                self.insert(field, err.to_string());
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// ## Summary
    /// Converts accumulated messages into a `Validation` error.
    ///
    /// ## Errors
    /// Returns `ServiceError::Validation` when any message was recorded.
    pub fn into_result(self) -> ServiceResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_db::error::TreeError;

    #[test]
    fn collect_files_tree_errors_and_keeps_going() {
        let mut errors = FieldErrors::new();
        assert!(!errors
            .collect("parent_id", Err(TreeError::MissingParent.into()))
            .unwrap());
        assert!(!errors
            .collect("ordering", Err(TreeError::OutOfBoundary { max: 4 }.into()))
            .unwrap());
        assert!(errors.collect("resource_name", Ok(())).unwrap());

        assert_eq!(errors.get("parent_id"), Some("parent not found"));
        assert_eq!(errors.get("ordering"), Some("position must be between 1 and 4"));
        assert!(matches!(
            errors.into_result(),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn serializes_as_flat_map() {
        let mut errors = FieldErrors::new();
        errors.insert("ordering", "position must be between 1 and 4");
        errors.insert("ordering", "ignored");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"ordering": "position must be between 1 and 4"})
        );
    }
}
