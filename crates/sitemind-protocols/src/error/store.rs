//! Knowledge store errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = StoreError::NotFound("session-123".to_string());
        let display = err.to_string();
        assert!(display.contains("not found"));
        assert!(display.contains("session-123"));
    }

    #[test]
    fn test_query_error() {
        let err = StoreError::QueryError("no such table".to_string());
        assert!(err.to_string().contains("Query error"));
        assert!(err.to_string().contains("no such table"));
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = StoreError::from(json_err);
        assert!(matches!(err, StoreError::SerializationError(_)));
    }

    #[test]
    fn test_all_error_variants() {
        let errors: Vec<StoreError> = vec![
            StoreError::NotFound("a".to_string()),
            StoreError::StorageError("b".to_string()),
            StoreError::QueryError("c".to_string()),
            StoreError::SerializationError("d".to_string()),
            StoreError::ConnectionError("e".to_string()),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
