//! Handles the readiness probe needs after startup.

use std::sync::Arc;

use database::DatabaseConnection;
use domain_merchant_assistant::VectorIndex;

/// Shared application state. Cloning copies two pointers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub db: DatabaseConnection,
    /// Vector index the assistant writes to
    pub index: Arc<dyn VectorIndex>,
}
