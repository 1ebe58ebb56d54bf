//! Convenience result type alias for Content Ops.

use crate::error::AppError;

/// A specialized `Result` type for Content Ops operations.
pub type AppResult<T> = Result<T, AppError>;
