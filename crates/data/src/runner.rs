//! Structured query capability.

use crate::result::ResultSet;
use epiqa_core::AppResult;

/// Executes query text against the structured store.
///
/// Implementations contain no query construction logic. Failures are
/// reported as `AppError::Execution` with the store's message verbatim.
#[async_trait::async_trait]
pub trait StructuredQueryRunner: Send + Sync {
    async fn run_query(&self, query: &str) -> AppResult<ResultSet>;
}
