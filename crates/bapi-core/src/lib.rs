//! bapi-core - Core traits and types for BAPI gateways
//!
//! This crate provides the abstractions shared by every layer of the bridge:
//! the typed field model, the connector seam a backend implements, the pooled
//! destinations that hand out [`Session`]s, and the [`TransactionOrchestrator`]
//! that wraps mutating calls in a commit/rollback envelope.
//!
//! # Usage
//!
//! ```ignore
//! use bapi_core::{DestinationProvider, FunctionCall, TransactionOrchestrator};
//!
//! let destination = registry.resolve("SAP_DEST")?;
//! let mut session = destination.acquire().await?;
//!
//! let call = FunctionCall::new("BAPI_EPM_BP_DELETE").scalar("BP_ID", "0100000000");
//! let outcome = TransactionOrchestrator::default().execute(&mut session, call).await?;
//! assert!(outcome.committed);
//! ```

pub mod connector;
pub mod destination;
pub mod error;
pub mod gateway;
pub mod models;
pub mod projection;
pub mod transaction;

#[cfg(test)]
pub(crate) mod test_support;

pub use connector::{Connection, Connector, FunctionResponse};
pub use destination::{Destination, DestinationConfig, DestinationProvider, DestinationRegistry};
pub use error::{RfcError, RfcResult};
pub use gateway::Session;
pub use models::*;
pub use projection::{BindingKind, FieldBinding, InvalidField};
pub use transaction::{TransactionOrchestrator, COMMIT_FUNCTION, ROLLBACK_FUNCTION};
