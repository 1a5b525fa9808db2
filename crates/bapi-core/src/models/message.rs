//! Backend diagnostic messages (BAPIRET2-style `RETURN` entries)

use std::fmt;

use serde::{Deserialize, Serialize};

use super::field::FieldSet;
use crate::error::{RfcError, RfcResult};

/// Name of the parameter that carries messages on every BAPI
pub const RETURN_PARAMETER: &str = "RETURN";

/// Backend-assigned message classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
    Abort,
    Info,
}

impl Severity {
    /// Parse the one-letter code used in `RETURN-TYPE`
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" => Some(Severity::Success),
            "W" => Some(Severity::Warning),
            "E" => Some(Severity::Error),
            "A" => Some(Severity::Abort),
            "I" => Some(Severity::Info),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Severity::Success => "S",
            Severity::Warning => "W",
            Severity::Error => "E",
            Severity::Abort => "A",
            Severity::Info => "I",
        }
    }

    /// Error and Abort classify a call as failed
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error | Severity::Abort)
    }
}

/// One diagnostic entry returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub severity: Severity,
    /// Message class
    pub id: String,
    /// Message number within the class
    pub number: String,
    pub text: String,
}

impl Message {
    pub fn new(
        severity: Severity,
        id: impl Into<String>,
        number: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            id: id.into(),
            number: number.into(),
            text: text.into(),
        }
    }

    /// Decode a `RETURN` row. A blank `TYPE` means the row carries no message.
    pub fn from_return_row(function: &str, row: &FieldSet) -> RfcResult<Option<Self>> {
        let code = row.text("TYPE").unwrap_or_default();
        if code.trim().is_empty() {
            return Ok(None);
        }

        let severity = Severity::from_code(code.trim()).ok_or_else(|| {
            RfcError::mismatch(function, format!("unknown message type '{}'", code))
        })?;

        Ok(Some(Self {
            severity,
            id: row.text("ID").unwrap_or_default(),
            number: row.text("NUMBER").unwrap_or_default(),
            text: row.text("MESSAGE").unwrap_or_default(),
        }))
    }

    /// Encode as a `RETURN` row
    pub fn to_return_row(&self) -> FieldSet {
        FieldSet::new()
            .with("TYPE", self.severity.code())
            .with("ID", self.id.as_str())
            .with("NUMBER", self.number.as_str())
            .with("MESSAGE", self.text.as_str())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Type: {}, ID: {}, Number: {}, Message: {}",
            self.severity.code(),
            self.id,
            self.number,
            self.text
        )
    }
}

/// Whether any message classifies the call as failed
pub fn has_error(messages: &[Message]) -> bool {
    messages.iter().any(|m| m.severity.is_error())
}

/// Join messages in backend order for human-readable diagnostics
pub fn summarize(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
