//! Connector seam - the boundary to the vendor remote-call library
//!
//! A [`Connector`] opens connections for a destination; a [`Connection`] is
//! one stateful backend context. Transactions are bound to the connection
//! they were started on, so commit and rollback must run on the same one.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::destination::DestinationConfig;
use crate::error::RfcResult;
use crate::models::{FieldSet, FunctionCall, FunctionSignature};

/// Raw outputs of an executed function, as delivered by the connector
#[derive(Debug, Clone, Default)]
pub struct FunctionResponse {
    pub exports: FieldSet,
    pub structures: BTreeMap<String, FieldSet>,
    pub tables: BTreeMap<String, Vec<FieldSet>>,
}

/// Opens connections to one backend system
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new connection; fails with [`RfcError::Connection`](crate::RfcError::Connection)
    /// when the backend is unreachable or refuses the credentials.
    async fn connect(&self, config: &DestinationConfig) -> RfcResult<Box<dyn Connection>>;
}

/// One open backend context
#[async_trait]
pub trait Connection: Send {
    /// Fetch the declared signature of a function from the backend repository
    async fn lookup(&mut self, function: &str) -> RfcResult<FunctionSignature>;

    /// Execute a function synchronously on this connection
    async fn execute(&mut self, call: &FunctionCall) -> RfcResult<FunctionResponse>;
}
