//! Function calls, their results and transaction outcomes

use std::collections::BTreeMap;

use serde::Serialize;

use super::field::{FieldSet, FieldValue, SparsePatch};
use super::message::{self, Message};
use crate::error::{RfcError, RfcResult};

/// A request-scoped remote function invocation: the function name plus all
/// top-level scalars, named sub-structures and input tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionCall {
    name: String,
    pub scalars: FieldSet,
    pub structures: BTreeMap<String, FieldSet>,
    pub tables: BTreeMap<String, Vec<FieldSet>>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scalars: FieldSet::new(),
            structures: BTreeMap::new(),
            tables: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set a top-level import scalar
    pub fn scalar(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.scalars.set(name, value);
        self
    }

    /// Set a named import structure
    pub fn structure(mut self, name: impl Into<String>, fields: FieldSet) -> Self {
        self.structures.insert(name.into(), fields);
        self
    }

    /// Set a change structure and its `X`-flag companion from one patch
    pub fn change(
        mut self,
        name: impl Into<String>,
        flags_name: impl Into<String>,
        patch: SparsePatch,
    ) -> Self {
        let flags = patch.mask().to_field_set();
        let (values, _) = patch.into_parts();
        self.structures.insert(name.into(), values);
        self.structures.insert(flags_name.into(), flags);
        self
    }

    /// Set an input table
    pub fn table(mut self, name: impl Into<String>, rows: Vec<FieldSet>) -> Self {
        self.tables.insert(name.into(), rows);
        self
    }
}

/// Outcome of one remote invocation: ordered messages plus every declared
/// export and table of the function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallResult {
    pub function: String,
    pub messages: Vec<Message>,
    pub exports: FieldSet,
    pub structures: BTreeMap<String, FieldSet>,
    pub tables: BTreeMap<String, Vec<FieldSet>>,
}

impl CallResult {
    /// True iff any message has Error or Abort severity
    pub fn has_error(&self) -> bool {
        message::has_error(&self.messages)
    }

    /// Messages joined in backend order
    pub fn summary(&self) -> String {
        message::summarize(&self.messages)
    }

    pub fn export(&self, name: &str) -> RfcResult<&FieldValue> {
        self.exports
            .get(name)
            .ok_or_else(|| RfcError::mismatch(&self.function, format!("no export {}", name)))
    }

    pub fn structure(&self, name: &str) -> RfcResult<&FieldSet> {
        self.structures
            .get(name)
            .ok_or_else(|| RfcError::mismatch(&self.function, format!("no structure {}", name)))
    }

    pub fn table(&self, name: &str) -> RfcResult<&[FieldSet]> {
        self.tables
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| RfcError::mismatch(&self.function, format!("no table {}", name)))
    }
}

/// Terminal result of a commit/rollback envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionOutcome {
    pub committed: bool,
    /// The primary call, for projecting exports such as created identifiers
    pub result: CallResult,
}

impl TransactionOutcome {
    pub fn messages(&self) -> &[Message] {
        &self.result.messages
    }
}
