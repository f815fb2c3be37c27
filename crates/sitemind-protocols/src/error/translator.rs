//! Translator errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslatorError {
    #[error("Translation failed: {0}")]
    Failed(String),

    #[error("Malformed translator output: {0}")]
    Malformed(String),
}
