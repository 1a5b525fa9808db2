//! Declarative field projection between request records and remote structures
//!
//! Each record type declares one table of [`FieldBinding`]s. The same table
//! drives the sparse copy into a [`FieldSet`] or [`SparsePatch`] and the
//! projection of a returned structure back into a record, so no endpoint
//! repeats per-field "if present, set value (and flag)" code.

use thiserror::Error;

use crate::error::{RfcError, RfcResult};
use crate::models::{FieldSet, FieldValue, SparsePatch};

/// How a bound field is typed on the remote side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Text,
    /// Accepts `YYYYMMDD` or `YYYY-MM-DD`
    Date,
}

/// Maps one record field to one remote field name
pub struct FieldBinding<R> {
    pub remote: &'static str,
    pub kind: BindingKind,
    pub get: fn(&R) -> Option<&str>,
    pub set: fn(&mut R, String),
}

/// A client-supplied value that cannot be converted to the remote type
#[derive(Debug, Error)]
#[error("Invalid value for {field}: '{value}'")]
pub struct InvalidField {
    pub field: &'static str,
    pub value: String,
}

impl<R> FieldBinding<R> {
    /// The value to send, or `None` when the record leaves the field out.
    /// Empty strings count as "not provided".
    fn value(&self, record: &R) -> Result<Option<FieldValue>, InvalidField> {
        let Some(raw) = (self.get)(record).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        match self.kind {
            BindingKind::Text => Ok(Some(FieldValue::from(raw))),
            BindingKind::Date => FieldValue::parse_date(raw)
                .map(|d| Some(FieldValue::Date(d)))
                .ok_or_else(|| InvalidField {
                    field: self.remote,
                    value: raw.to_string(),
                }),
        }
    }
}

/// Copy only the provided fields of `record` into a new structure
pub fn fields_from<R>(record: &R, bindings: &[FieldBinding<R>]) -> Result<FieldSet, InvalidField> {
    let mut fields = FieldSet::new();
    for binding in bindings {
        if let Some(value) = binding.value(record)? {
            fields.set(binding.remote, value);
        }
    }
    Ok(fields)
}

/// Copy only the provided fields of `record`, flagging each as changed
pub fn patch_from<R>(
    record: &R,
    bindings: &[FieldBinding<R>],
) -> Result<SparsePatch, InvalidField> {
    let mut patch = SparsePatch::new();
    for binding in bindings {
        if let Some(value) = binding.value(record)? {
            patch.set(binding.remote, value);
        }
    }
    Ok(patch)
}

/// Fill a record from a returned structure.
///
/// Every binding must exist in `fields`; a missing one means the record
/// table and the remote interface disagree.
pub fn project<R: Default>(
    function: &str,
    fields: &FieldSet,
    bindings: &[FieldBinding<R>],
) -> RfcResult<R> {
    let mut record = R::default();
    project_into(&mut record, function, fields, bindings)?;
    Ok(record)
}

/// Like [`project`], into an existing record (for records assembled from
/// several structures)
pub fn project_into<R>(
    record: &mut R,
    function: &str,
    fields: &FieldSet,
    bindings: &[FieldBinding<R>],
) -> RfcResult<()> {
    for binding in bindings {
        let value = fields.text(binding.remote).ok_or_else(|| {
            RfcError::mismatch(function, format!("no field {} in result", binding.remote))
        })?;
        (binding.set)(record, value);
    }
    Ok(())
}
