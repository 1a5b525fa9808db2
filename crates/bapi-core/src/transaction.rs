//! Transaction orchestrator
//!
//! Wraps one state-mutating remote call in the backend's commit/rollback
//! envelope:
//!
//! ```text
//! begin LUW ─► invoke primary ─► classify RETURN messages
//!                   │                 │               │
//!                 raises          Error/Abort       otherwise
//!                   │                 │               │
//!                   ▼                 ▼               ▼
//!        rollback (best effort)    ROLLBACK         COMMIT
//!        propagate primary error   committed=false  committed=true
//! ```
//!
//! A failing commit or rollback supersedes the primary outcome and is
//! reported as [`RfcError::TransactionInfrastructure`]. Read-only calls go
//! straight to [`Session::invoke`] and never pass through here.

use tracing::{error, info, warn};

use crate::error::{RfcError, RfcResult};
use crate::gateway::Session;
use crate::models::{FunctionCall, Message, TransactionOutcome, CHANGE_FLAG};

pub const COMMIT_FUNCTION: &str = "BAPI_TRANSACTION_COMMIT";
pub const ROLLBACK_FUNCTION: &str = "BAPI_TRANSACTION_ROLLBACK";

/// Runs primary calls inside a commit/rollback envelope
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionOrchestrator {
    /// Pass `WAIT = 'X'` so commit returns only after the update task ran
    pub commit_wait: bool,
}

impl TransactionOrchestrator {
    pub fn new(commit_wait: bool) -> Self {
        Self { commit_wait }
    }

    /// Execute `call` and finalize it with a commit or a rollback.
    ///
    /// Calls on the session are strictly sequential: invoke, classify, then
    /// exactly one of commit or rollback.
    pub async fn execute(
        &self,
        session: &mut Session,
        call: FunctionCall,
    ) -> RfcResult<TransactionOutcome> {
        let function = call.name().to_string();
        let luw = session.begin_luw();

        let result = match session.invoke(call).await {
            Ok(result) => result,
            Err(err) => {
                warn!(%luw, %function, error = %err, "Primary call failed, rolling back");
                if let Err(rollback_err) = self.rollback(session, &[]).await {
                    error!(%luw, %function, error = %rollback_err, "Rollback after failed call also failed");
                }
                return Err(err);
            }
        };

        if result.has_error() {
            self.rollback(session, &result.messages).await?;
            info!(%luw, %function, summary = %result.summary(), "Transaction rolled back");
            Ok(TransactionOutcome {
                committed: false,
                result,
            })
        } else {
            self.commit(session, &result.messages).await?;
            info!(%luw, %function, messages = result.messages.len(), "Transaction committed");
            Ok(TransactionOutcome {
                committed: true,
                result,
            })
        }
    }

    async fn commit(&self, session: &mut Session, primary: &[Message]) -> RfcResult<()> {
        let mut call = FunctionCall::new(COMMIT_FUNCTION);
        if self.commit_wait {
            call = call.scalar("WAIT", CHANGE_FLAG);
        }
        self.finalize(session, call, "commit", primary).await
    }

    async fn rollback(&self, session: &mut Session, primary: &[Message]) -> RfcResult<()> {
        self.finalize(session, FunctionCall::new(ROLLBACK_FUNCTION), "rollback", primary)
            .await
    }

    async fn finalize(
        &self,
        session: &mut Session,
        call: FunctionCall,
        action: &'static str,
        primary: &[Message],
    ) -> RfcResult<()> {
        let infrastructure = |reason: String| RfcError::TransactionInfrastructure {
            action,
            reason,
            messages: primary.to_vec(),
        };

        let result = session
            .invoke(call)
            .await
            .map_err(|err| infrastructure(err.to_string()))?;

        if result.has_error() {
            return Err(infrastructure(result.summary()));
        }

        session.end_luw();
        Ok(())
    }
}
