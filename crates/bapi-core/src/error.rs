//! Error taxonomy for remote function calls

use thiserror::Error;

use crate::models::Message;

/// Result type for remote call operations
pub type RfcResult<T> = Result<T, RfcError>;

/// Errors that can occur while talking to the backend.
///
/// A call whose `RETURN` messages carry Error/Abort severity is *not* an
/// `RfcError`: the invocation succeeded and reported a business failure,
/// see [`CallResult::has_error`](crate::CallResult::has_error).
#[derive(Debug, Error)]
pub enum RfcError {
    /// Destination unknown, unreachable, pool exhausted or connection lost
    #[error("Connection error: {0}")]
    Connection(String),

    /// Function or field does not exist on the remote interface
    #[error("Interface mismatch: {0}")]
    InterfaceMismatch(String),

    /// The backend raised an exception while executing the function
    #[error("Remote runtime error: {0}")]
    RemoteRuntime(String),

    /// Commit or rollback itself failed; backend state may be inconsistent
    #[error("Transaction {action} failed: {reason}")]
    TransactionInfrastructure {
        /// "commit" or "rollback"
        action: &'static str,
        /// Text of the underlying failure
        reason: String,
        /// Messages returned by the primary call, in backend order
        messages: Vec<Message>,
    },
}

impl RfcError {
    /// Shorthand for an interface mismatch on a named function
    pub fn mismatch(function: &str, detail: impl std::fmt::Display) -> Self {
        RfcError::InterfaceMismatch(format!("{}: {}", function, detail))
    }

    /// Whether the connection that produced this error must not be reused
    pub fn poisons_connection(&self) -> bool {
        matches!(self, RfcError::Connection(_))
    }

    /// Messages obtained before the failure, if any
    pub fn messages(&self) -> &[Message] {
        match self {
            RfcError::TransactionInfrastructure { messages, .. } => messages,
            _ => &[],
        }
    }
}
