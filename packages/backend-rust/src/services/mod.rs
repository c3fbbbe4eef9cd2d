pub mod catalog;
pub mod intervention;
pub mod mastery;
pub mod path;
pub mod students;

use mastery_algo::{CatalogError, KcId, PathError, StudentId, TraceError};

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("out-of-order response for student {student_id} on KC {kc_id}: {timestamp} precedes {last}")]
    OutOfOrder {
        student_id: StudentId,
        kc_id: KcId,
        last: i64,
        timestamp: i64,
    },
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Trace(#[from] TraceError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OutOfOrder {
                student_id,
                kc_id,
                last,
                timestamp,
            } => Self::OutOfOrder {
                student_id,
                kc_id,
                last,
                timestamp,
            },
            StoreError::Catalog(e) => Self::Catalog(e),
            StoreError::Trace(e) => Self::Trace(e),
        }
    }
}

/// Current time in epoch milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn require_id(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
