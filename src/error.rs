// Error taxonomy for task store operations

use crate::models::{MAX_TEXT_LEN, TaskId};
use thiserror::Error;

/// Rejected task text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a task!")]
    Empty,
    #[error("Task is too long! Maximum {max} characters.")]
    TooLong { len: usize, max: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("No task ids left")]
    IdsExhausted,

    #[error("Failed to persist tasks")]
    Persistence(#[source] eyre::Report),
}

impl StoreError {
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Trim `raw` and check it against the length limits
pub fn validate_text(raw: &str) -> Result<String, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ValidationError::Empty);
    }

    let len = text.chars().count();
    if len > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            len,
            max: MAX_TEXT_LEN,
        });
    }

    Ok(text.to_string())
}
