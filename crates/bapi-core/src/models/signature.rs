//! Remote interface metadata (function signatures)

use serde::{Deserialize, Serialize};

use super::call::FunctionCall;
use crate::error::{RfcError, RfcResult};

/// Parameter direction as declared by the remote function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Import,
    Export,
    Tables,
}

/// Shape of a parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "lowercase")]
pub enum ParameterKind {
    Scalar,
    /// Flat structure with the declared field names
    Structure(Vec<String>),
    /// Table whose rows have the declared field names
    Table(Vec<String>),
}

impl ParameterKind {
    fn fields(&self) -> &[String] {
        match self {
            ParameterKind::Scalar => &[],
            ParameterKind::Structure(fields) | ParameterKind::Table(fields) => fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    pub direction: Direction,
    pub kind: ParameterKind,
}

/// Declared signature of a remote function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub parameters: Vec<ParameterDef>,
}

fn owned(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    fn param(mut self, name: &str, direction: Direction, kind: ParameterKind) -> Self {
        self.parameters.push(ParameterDef {
            name: name.to_string(),
            direction,
            kind,
        });
        self
    }

    pub fn import_scalar(self, name: &str) -> Self {
        self.param(name, Direction::Import, ParameterKind::Scalar)
    }

    pub fn import_structure(self, name: &str, fields: &[&str]) -> Self {
        self.param(name, Direction::Import, ParameterKind::Structure(owned(fields)))
    }

    pub fn export_scalar(self, name: &str) -> Self {
        self.param(name, Direction::Export, ParameterKind::Scalar)
    }

    pub fn export_structure(self, name: &str, fields: &[&str]) -> Self {
        self.param(name, Direction::Export, ParameterKind::Structure(owned(fields)))
    }

    pub fn table(self, name: &str, fields: &[&str]) -> Self {
        self.param(name, Direction::Tables, ParameterKind::Table(owned(fields)))
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDef> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Parameters the backend hands back (exports and tables)
    pub fn outputs(&self) -> impl Iterator<Item = &ParameterDef> {
        self.parameters
            .iter()
            .filter(|p| matches!(p.direction, Direction::Export | Direction::Tables))
    }

    /// Check that every name in the call exists with the right shape
    pub fn validate(&self, call: &FunctionCall) -> RfcResult<()> {
        for name in call.scalars.names() {
            match self.parameter(name) {
                Some(ParameterDef {
                    direction: Direction::Import,
                    kind: ParameterKind::Scalar,
                    ..
                }) => {}
                Some(_) => {
                    return Err(RfcError::mismatch(
                        &self.name,
                        format!("parameter {} is not an import scalar", name),
                    ))
                }
                None => {
                    return Err(RfcError::mismatch(
                        &self.name,
                        format!("unknown parameter {}", name),
                    ))
                }
            }
        }

        for (name, fields) in &call.structures {
            let def = self.expect(name, Direction::Import, "import structure", |k| {
                matches!(k, ParameterKind::Structure(_))
            })?;
            self.check_fields(name, def, fields.names())?;
        }

        for (name, rows) in &call.tables {
            let def = self.expect(name, Direction::Tables, "table", |k| {
                matches!(k, ParameterKind::Table(_))
            })?;
            for row in rows {
                self.check_fields(name, def, row.names())?;
            }
        }

        Ok(())
    }

    fn expect(
        &self,
        name: &str,
        direction: Direction,
        what: &str,
        shape: impl Fn(&ParameterKind) -> bool,
    ) -> RfcResult<&ParameterDef> {
        let def = self
            .parameter(name)
            .ok_or_else(|| RfcError::mismatch(&self.name, format!("unknown parameter {}", name)))?;
        if def.direction != direction || !shape(&def.kind) {
            return Err(RfcError::mismatch(
                &self.name,
                format!("parameter {} is not declared as {}", name, what),
            ));
        }
        Ok(def)
    }

    fn check_fields<'a>(
        &self,
        parameter: &str,
        def: &ParameterDef,
        names: impl Iterator<Item = &'a str>,
    ) -> RfcResult<()> {
        let declared = def.kind.fields();
        for field in names {
            if !declared.iter().any(|d| d == field) {
                return Err(RfcError::mismatch(
                    &self.name,
                    format!("unknown field {}-{}", parameter, field),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldSet;

    fn create_signature() -> FunctionSignature {
        FunctionSignature::new("BAPI_EPM_BP_CREATE")
            .import_structure("HEADERDATA", &["COMPANY_NAME", "CITY"])
            .import_scalar("PERSIST_TO_DB")
            .export_scalar("BUSINESSPARTNERID")
            .table("RETURN", &["TYPE", "ID", "NUMBER", "MESSAGE"])
    }

    #[test]
    fn test_valid_call_passes() {
        let call = FunctionCall::new("BAPI_EPM_BP_CREATE")
            .structure("HEADERDATA", FieldSet::new().with("COMPANY_NAME", "Acme"))
            .scalar("PERSIST_TO_DB", "X");
        create_signature().validate(&call).unwrap();
    }

    #[test]
    fn test_unknown_structure_field_fails() {
        let call = FunctionCall::new("BAPI_EPM_BP_CREATE")
            .structure("HEADERDATA", FieldSet::new().with("FIRST_NAME", "Jo"));
        let err = create_signature().validate(&call).unwrap_err();
        assert!(err.to_string().contains("HEADERDATA-FIRST_NAME"), "{}", err);
    }

    #[test]
    fn test_scalar_passed_as_structure_fails() {
        let call = FunctionCall::new("BAPI_EPM_BP_CREATE")
            .structure("PERSIST_TO_DB", FieldSet::new());
        assert!(matches!(
            create_signature().validate(&call),
            Err(RfcError::InterfaceMismatch(_))
        ));
    }

    #[test]
    fn test_export_is_not_importable() {
        let call = FunctionCall::new("BAPI_EPM_BP_CREATE").scalar("BUSINESSPARTNERID", "1");
        assert!(create_signature().validate(&call).is_err());
    }

    #[test]
    fn test_outputs_lists_exports_and_tables() {
        let names: Vec<_> = create_signature()
            .outputs()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(names, vec!["BUSINESSPARTNERID", "RETURN"]);
    }
}
