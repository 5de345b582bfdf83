//! Query error types

use thiserror::Error;
use uuid::Uuid;

use crate::domain::QueryStatus;

/// Result type for query lifecycle operations
pub type QueryResult<T> = std::result::Result<T, QueryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// `run()` was already called on this query
    #[error("query {query_id} has already been started")]
    AlreadyStarted { query_id: Uuid },

    /// Requested a status change the lifecycle does not allow
    #[error("invalid query status transition from {from} to {to}")]
    InvalidTransition { from: QueryStatus, to: QueryStatus },
}
