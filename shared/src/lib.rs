//! Shared types for the order lifecycle service
//!
//! Wire/domain types for orders and audit entries, plus the unified
//! error system used by the server and its clients.

pub mod error;
pub mod order;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
