//! Remote call gateway
//!
//! [`Session`] is the scoped handle on one pooled connection. It validates
//! every call against the function's declared signature before the backend
//! sees it, executes it, and normalizes the response into a [`CallResult`]
//! that carries every declared output plus the ordered `RETURN` messages.

use std::fmt;
use std::sync::Arc;

use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::connector::{Connection, FunctionResponse};
use crate::destination::Destination;
use crate::error::{RfcError, RfcResult};
use crate::models::{
    CallResult, Direction, FieldSet, FieldValue, FunctionCall, FunctionSignature, Message,
    ParameterKind, RETURN_PARAMETER,
};

/// A pooled connection checked out of a [`Destination`].
///
/// Dropping the session gives the connection back to the pool. A connection
/// that failed at the transport level, or that still has an open logical unit
/// of work, is discarded instead so the backend closes its context.
pub struct Session {
    destination: Destination,
    connection: Option<Box<dyn Connection>>,
    luw: Option<Uuid>,
    poisoned: bool,
    _permit: OwnedSemaphorePermit,
}

impl Session {
    pub(crate) fn new(
        destination: Destination,
        connection: Box<dyn Connection>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            destination,
            connection: Some(connection),
            luw: None,
            poisoned: false,
            _permit: permit,
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Id of the open logical unit of work, if any
    pub fn luw(&self) -> Option<Uuid> {
        self.luw
    }

    pub(crate) fn begin_luw(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.luw = Some(id);
        id
    }

    pub(crate) fn end_luw(&mut self) {
        self.luw = None;
    }

    /// Invoke a remote function and return its normalized result.
    ///
    /// Business failures come back as `Ok` with Error/Abort messages; only
    /// transport, interface and runtime failures are `Err`.
    pub async fn invoke(&mut self, call: FunctionCall) -> RfcResult<CallResult> {
        let signature = self.signature(call.name()).await?;
        signature.validate(&call)?;

        let connection = self.connection()?;
        let response = connection.execute(&call).await;
        let response = self.track(response)?;

        let result = build_result(&signature, response)?;
        debug!(
            destination = %self.destination.name(),
            function = %result.function,
            messages = result.messages.len(),
            has_error = result.has_error(),
            "Remote function invoked"
        );
        Ok(result)
    }

    async fn signature(&mut self, function: &str) -> RfcResult<Arc<FunctionSignature>> {
        if let Some(signature) = self.destination.cached_signature(function) {
            return Ok(signature);
        }

        let connection = self.connection()?;
        let looked_up = connection.lookup(function).await;
        let signature = self.track(looked_up)?;
        if signature.name != function {
            return Err(RfcError::mismatch(
                function,
                format!("repository returned signature of {}", signature.name),
            ));
        }

        debug!(destination = %self.destination.name(), function, "Cached function signature");
        Ok(self.destination.cache_signature(signature))
    }

    fn connection(&mut self) -> RfcResult<&mut Box<dyn Connection>> {
        if self.poisoned {
            return Err(RfcError::Connection(format!(
                "{}: connection is no longer usable",
                self.destination.name()
            )));
        }
        self.connection
            .as_mut()
            .ok_or_else(|| RfcError::Connection("session already released".to_string()))
    }

    fn track<T>(&mut self, result: RfcResult<T>) -> RfcResult<T> {
        if let Err(err) = &result {
            if err.poisons_connection() {
                self.poisoned = true;
            }
        }
        result
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("destination", &self.destination.name())
            .field("luw", &self.luw)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        if let Some(luw) = self.luw {
            error!(
                destination = %self.destination.name(),
                %luw,
                "Session released with an open transaction; discarding connection to abort it"
            );
            drop(connection);
        } else if self.poisoned {
            warn!(destination = %self.destination.name(), "Discarding broken connection");
            drop(connection);
        } else {
            self.destination.release(connection);
        }
    }
}

fn empty() -> FieldValue {
    FieldValue::Text(String::new())
}

/// Copy the declared fields of `given`, filling absent ones with empty text
fn normalize(fields: &[String], given: Option<&FieldSet>) -> FieldSet {
    fields
        .iter()
        .map(|name| {
            let value = given
                .and_then(|g| g.get(name))
                .cloned()
                .unwrap_or_else(empty);
            (name.clone(), value)
        })
        .collect()
}

fn build_result(
    signature: &FunctionSignature,
    mut response: FunctionResponse,
) -> RfcResult<CallResult> {
    let mut result = CallResult {
        function: signature.name.clone(),
        ..Default::default()
    };

    for param in signature.outputs() {
        match (&param.direction, &param.kind) {
            (Direction::Export, ParameterKind::Scalar) => {
                let value = response
                    .exports
                    .get(&param.name)
                    .cloned()
                    .unwrap_or_else(empty);
                result.exports.set(param.name.clone(), value);
            }
            (Direction::Export, ParameterKind::Structure(fields)) => {
                let given = response.structures.remove(&param.name);
                result
                    .structures
                    .insert(param.name.clone(), normalize(fields, given.as_ref()));
            }
            (_, ParameterKind::Table(fields)) => {
                let rows = response
                    .tables
                    .remove(&param.name)
                    .unwrap_or_default()
                    .iter()
                    .map(|row| normalize(fields, Some(row)))
                    .collect();
                result.tables.insert(param.name.clone(), rows);
            }
            _ => {}
        }
    }

    let return_rows: Vec<&FieldSet> = match result.tables.get(RETURN_PARAMETER) {
        Some(rows) => rows.iter().collect(),
        None => result.structures.get(RETURN_PARAMETER).into_iter().collect(),
    };
    let mut messages = Vec::with_capacity(return_rows.len());
    for row in return_rows {
        if let Some(message) = Message::from_return_row(&signature.name, row)? {
            messages.push(message);
        }
    }
    result.messages = messages;

    Ok(result)
}
