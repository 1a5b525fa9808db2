//! Application state for the REST facade

use std::sync::Arc;

use bapi_core::{
    CallResult, DestinationProvider, FunctionCall, Session, TransactionOrchestrator,
};
use tracing::debug;

use crate::error::ApiError;

/// Remote function used by `DELETE /users/{username}` unless configured
pub const DEFAULT_USER_DELETE_FUNCTION: &str = "SUSR_USER_DELETE";

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolves destination names to pooled destinations
    destinations: Arc<dyn DestinationProvider>,
    /// Destination every route talks to
    destination: Arc<str>,
    user_delete_function: Arc<str>,
}

impl AppState {
    pub fn new(destinations: Arc<dyn DestinationProvider>, destination: impl Into<String>) -> Self {
        Self {
            destinations,
            destination: Arc::from(destination.into()),
            user_delete_function: Arc::from(DEFAULT_USER_DELETE_FUNCTION),
        }
    }

    /// Use a different remote function for user deletion
    pub fn with_user_delete_function(mut self, function: impl Into<String>) -> Self {
        self.user_delete_function = Arc::from(function.into());
        self
    }

    pub fn destination_name(&self) -> &str {
        &self.destination
    }

    pub fn user_delete_function(&self) -> &str {
        &self.user_delete_function
    }

    /// Check a session out of the configured destination's pool
    pub async fn session(&self) -> Result<Session, ApiError> {
        let destination = self.destinations.resolve(&self.destination)?;
        Ok(destination.acquire().await?)
    }

    /// Run a read-only call. No commit or rollback is issued.
    pub async fn read(&self, call: FunctionCall) -> Result<CallResult, ApiError> {
        let mut session = self.session().await?;
        let result = session.invoke(call).await?;
        if result.has_error() {
            return Err(ApiError::business(result.messages));
        }
        Ok(result)
    }

    /// Run a mutating call inside the commit/rollback envelope.
    ///
    /// The work runs on its own task so a client that disconnects mid-call
    /// cannot abandon the transaction between invoke and commit/rollback.
    /// Returns the committed result; a rolled-back call becomes
    /// [`ApiError::Business`].
    pub async fn transact(&self, call: FunctionCall) -> Result<CallResult, ApiError> {
        let state = self.clone();
        let function = call.name().to_string();

        let outcome = tokio::spawn(async move {
            let mut session = state.session().await?;
            let orchestrator =
                TransactionOrchestrator::new(session.destination().config().commit_wait);
            orchestrator
                .execute(&mut session, call)
                .await
                .map_err(ApiError::from)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("Transaction task for {} failed: {}", function, e)))??;

        debug!(%function, committed = outcome.committed, "Transaction finished");
        if outcome.committed {
            Ok(outcome.result)
        } else {
            Err(ApiError::business(outcome.result.messages))
        }
    }
}
