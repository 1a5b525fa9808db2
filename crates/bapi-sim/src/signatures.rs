//! Function repository of the simulated system

use bapi_core::{FunctionSignature, COMMIT_FUNCTION, ROLLBACK_FUNCTION};

pub const BP_CREATE: &str = "BAPI_EPM_BP_CREATE";
pub const BP_GET_DETAIL: &str = "BAPI_EPM_BP_GET_DETAIL";
pub const BP_CHANGE: &str = "BAPI_EPM_BP_CHANGE";
pub const BP_DELETE: &str = "BAPI_EPM_BP_DELETE";
pub const USER_CREATE: &str = "BAPI_USER_CREATE1";
pub const USER_GET_DETAIL: &str = "BAPI_USER_GET_DETAIL";
pub const USER_CHANGE: &str = "BAPI_USER_CHANGE";
pub const USER_DELETE: &str = "SUSR_USER_DELETE";
pub const FLIGHT_GETLIST: &str = "BAPI_FLIGHT_GETLIST";

pub const RETURN_FIELDS: &[&str] = &["TYPE", "ID", "NUMBER", "MESSAGE"];

/// `BAPI_EPM_BP_HEADER`
pub const BP_HEADER_FIELDS: &[&str] = &[
    "BP_ID",
    "BP_ROLE",
    "EMAIL_ADDRESS",
    "PHONE_NUMBER",
    "FAX_NUMBER",
    "WEB_ADDRESS",
    "COMPANY_NAME",
    "LEGAL_FORM",
    "CURRENCY_CODE",
    "CITY",
    "POSTAL_CODE",
    "STREET",
    "BUILDING",
    "COUNTRY",
    "ADDRESS_TYPE",
];

/// `BAPIADDR3` (subset)
pub const ADDRESS_FIELDS: &[&str] = &["FIRSTNAME", "LASTNAME", "E_MAIL", "DEPARTMENT"];

/// `BAPILOGOND` (subset)
pub const LOGON_FIELDS: &[&str] = &["USTYP", "CLASS", "GLTGV", "GLTGB"];

pub const PASSWORD_FIELDS: &[&str] = &["BAPIPWD"];

pub const ACTIVITY_GROUP_FIELDS: &[&str] = &["AGR_NAME", "FROM_DAT", "TO_DAT"];

/// `BAPISFLDAT`
pub const FLIGHT_FIELDS: &[&str] = &[
    "AIRLINEID",
    "AIRLINE",
    "CONNECTID",
    "FLIGHTDATE",
    "AIRPORTFR",
    "CITYFROM",
    "AIRPORTTO",
    "CITYTO",
    "DEPTIME",
    "ARRTIME",
];

/// Look up a function's declared signature
pub fn lookup(function: &str) -> Option<FunctionSignature> {
    let sig = FunctionSignature::new(function);
    let sig = match function {
        BP_CREATE => sig
            .import_structure("HEADERDATA", BP_HEADER_FIELDS)
            .import_scalar("PERSIST_TO_DB")
            .export_scalar("BUSINESSPARTNERID")
            .table("RETURN", RETURN_FIELDS),
        BP_GET_DETAIL => sig
            .import_scalar("BP_ID")
            .export_structure("HEADERDATA", BP_HEADER_FIELDS)
            .table("RETURN", RETURN_FIELDS),
        BP_CHANGE => sig
            .import_scalar("BP_ID")
            .import_structure("HEADERDATA", BP_HEADER_FIELDS)
            .import_structure("HEADERDATAX", BP_HEADER_FIELDS)
            .table("RETURN", RETURN_FIELDS),
        BP_DELETE => sig
            .import_scalar("BP_ID")
            .table("RETURN", RETURN_FIELDS),
        USER_CREATE => sig
            .import_scalar("USERNAME")
            .import_structure("LOGONDATA", LOGON_FIELDS)
            .import_structure("PASSWORD", PASSWORD_FIELDS)
            .import_structure("ADDRESS", ADDRESS_FIELDS)
            .table("RETURN", RETURN_FIELDS),
        USER_GET_DETAIL => sig
            .import_scalar("USERNAME")
            .export_structure("ADDRESS", ADDRESS_FIELDS)
            .export_structure("LOGONDATA", LOGON_FIELDS)
            .table("ACTIVITYGROUPS", ACTIVITY_GROUP_FIELDS)
            .table("RETURN", RETURN_FIELDS),
        USER_CHANGE => sig
            .import_scalar("USERNAME")
            .import_structure("ADDRESS", ADDRESS_FIELDS)
            .import_structure("ADDRESSX", ADDRESS_FIELDS)
            .import_structure("LOGONDATA", LOGON_FIELDS)
            .import_structure("LOGONDATAX", LOGON_FIELDS)
            .table("RETURN", RETURN_FIELDS),
        USER_DELETE => sig.import_scalar("USER_NAME"),
        FLIGHT_GETLIST => sig
            .import_scalar("AIRLINE")
            .import_scalar("MAX_ROWS")
            .table("FLIGHT_LIST", FLIGHT_FIELDS)
            .table("RETURN", RETURN_FIELDS),
        COMMIT_FUNCTION => sig
            .import_scalar("WAIT")
            .export_structure("RETURN", RETURN_FIELDS),
        ROLLBACK_FUNCTION => sig.export_structure("RETURN", RETURN_FIELDS),
        _ => return None,
    };
    Some(sig)
}
