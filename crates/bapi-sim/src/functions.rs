//! Business logic of the simulated function modules

use bapi_core::{
    FieldSet, FieldValue, FunctionCall, FunctionResponse, Message, RfcError, RfcResult, Severity,
    CHANGE_FLAG, RETURN_PARAMETER,
};

use crate::signatures::{
    ACTIVITY_GROUP_FIELDS, ADDRESS_FIELDS, BP_CHANGE, BP_CREATE, BP_DELETE, BP_GET_DETAIL,
    BP_HEADER_FIELDS, FLIGHT_GETLIST, LOGON_FIELDS, USER_CHANGE, USER_CREATE, USER_DELETE,
    USER_GET_DETAIL,
};
use crate::system::{blank, Change, SimulatedSystem, UserRecord};

const BP_CLASS: &str = "EPM_BP";
const USER_CLASS: &str = "01";

/// Country keys the simulated customizing knows about
const COUNTRIES: &[&str] = &[
    "AT", "AU", "BE", "BR", "CA", "CH", "CN", "DE", "DK", "ES", "FI", "FR", "GB", "IE", "IN",
    "IT", "JP", "NL", "NO", "PL", "PT", "SE", "US",
];

/// Run a business function against the committed state, buffering its
/// changes into `pending`
pub(crate) fn execute(
    system: &SimulatedSystem,
    pending: &mut Vec<Change>,
    call: &FunctionCall,
) -> RfcResult<FunctionResponse> {
    match call.name() {
        BP_CREATE => bp_create(system, pending, call),
        BP_GET_DETAIL => bp_get_detail(system, call),
        BP_CHANGE => bp_change(system, pending, call),
        BP_DELETE => bp_delete(system, pending, call),
        USER_CREATE => user_create(system, pending, call),
        USER_GET_DETAIL => user_get_detail(system, call),
        USER_CHANGE => user_change(system, pending, call),
        USER_DELETE => user_delete(system, pending, call),
        FLIGHT_GETLIST => flight_getlist(system, call),
        other => Err(RfcError::RemoteRuntime(format!(
            "CALL_FUNCTION_NOT_FOUND: {}",
            other
        ))),
    }
}

/// A response whose only output is the `RETURN` table
pub(crate) fn returning(messages: Vec<Message>) -> FunctionResponse {
    let mut response = FunctionResponse::default();
    response.tables.insert(
        RETURN_PARAMETER.to_string(),
        messages.iter().map(Message::to_return_row).collect(),
    );
    response
}

fn bp_message(severity: Severity, number: &str, text: String) -> Message {
    Message::new(severity, BP_CLASS, number, text)
}

fn user_message(severity: Severity, number: &str, text: String) -> Message {
    Message::new(severity, USER_CLASS, number, text)
}

fn scalar(call: &FunctionCall, name: &str) -> String {
    call.scalars.text(name).unwrap_or_default()
}

/// Copy `source` into `target`; with a `flags` structure only the fields
/// flagged `X` are taken
fn merge(target: &mut FieldSet, source: Option<&FieldSet>, flags: Option<&FieldSet>) {
    let Some(source) = source else {
        return;
    };
    for (name, value) in source.iter() {
        let flagged = flags.map_or(true, |f| f.text(name).as_deref() == Some(CHANGE_FLAG));
        if flagged {
            target.set(name, value.clone());
        }
    }
}

/// Customizing checks on a partner header
fn check_header(header: &FieldSet) -> Vec<Message> {
    let mut messages = Vec::new();

    if let Some(country) = header.text("COUNTRY").filter(|c| !c.is_empty()) {
        if !COUNTRIES.contains(&country.as_str()) {
            messages.push(bp_message(
                Severity::Error,
                "012",
                "Invalid country code".to_string(),
            ));
        }
    }

    if let Some(kind) = header.text("ADDRESS_TYPE").filter(|t| !t.is_empty()) {
        if kind != "1" && kind != "2" {
            messages.push(bp_message(
                Severity::Error,
                "014",
                format!("Address type {} is not supported; use 1 or 2", kind),
            ));
        }
    }

    messages
}

fn partner_missing(id: &str) -> FunctionResponse {
    returning(vec![bp_message(
        Severity::Error,
        "002",
        format!("Business partner {} does not exist", id),
    )])
}

fn bp_create(
    system: &SimulatedSystem,
    pending: &mut Vec<Change>,
    call: &FunctionCall,
) -> RfcResult<FunctionResponse> {
    let mut header = blank(BP_HEADER_FIELDS);
    merge(&mut header, call.structures.get("HEADERDATA"), None);

    let mut messages = Vec::new();
    if header.text("COMPANY_NAME").unwrap_or_default().is_empty() {
        messages.push(bp_message(
            Severity::Error,
            "010",
            "Company name is required".to_string(),
        ));
    }
    messages.extend(check_header(&header));
    if !messages.is_empty() {
        return Ok(returning(messages));
    }

    let id = system.next_partner_id();
    header.set("BP_ID", id.as_str());
    pending.push(Change::PutPartner(id.clone(), header));

    let mut response = returning(vec![bp_message(
        Severity::Success,
        "000",
        format!("Business partner {} created", id),
    )]);
    response.exports.set("BUSINESSPARTNERID", id);
    Ok(response)
}

fn bp_get_detail(system: &SimulatedSystem, call: &FunctionCall) -> RfcResult<FunctionResponse> {
    let id = scalar(call, "BP_ID");
    let Some(header) = system.partner(&id) else {
        return Ok(partner_missing(&id));
    };

    let mut response = returning(Vec::new());
    response.structures.insert("HEADERDATA".to_string(), header);
    Ok(response)
}

fn bp_change(
    system: &SimulatedSystem,
    pending: &mut Vec<Change>,
    call: &FunctionCall,
) -> RfcResult<FunctionResponse> {
    let id = scalar(call, "BP_ID");
    let Some(mut header) = system.partner(&id) else {
        return Ok(partner_missing(&id));
    };

    merge(
        &mut header,
        call.structures.get("HEADERDATA"),
        Some(call.structures.get("HEADERDATAX").unwrap_or(&FieldSet::new())),
    );
    // The key itself is never changeable
    header.set("BP_ID", id.as_str());

    let errors = check_header(&header);
    if !errors.is_empty() {
        return Ok(returning(errors));
    }

    pending.push(Change::PutPartner(id.clone(), header));
    Ok(returning(vec![bp_message(
        Severity::Success,
        "001",
        format!("Business partner {} changed", id),
    )]))
}

fn bp_delete(
    system: &SimulatedSystem,
    pending: &mut Vec<Change>,
    call: &FunctionCall,
) -> RfcResult<FunctionResponse> {
    let id = scalar(call, "BP_ID");
    if system.partner(&id).is_none() {
        return Ok(partner_missing(&id));
    }

    pending.push(Change::RemovePartner(id.clone()));
    Ok(returning(vec![bp_message(
        Severity::Success,
        "003",
        format!("Business partner {} deleted", id),
    )]))
}

fn user_missing(username: &str) -> FunctionResponse {
    returning(vec![user_message(
        Severity::Error,
        "124",
        format!("User {} does not exist", username),
    )])
}

fn user_create(
    system: &SimulatedSystem,
    pending: &mut Vec<Change>,
    call: &FunctionCall,
) -> RfcResult<FunctionResponse> {
    let username = scalar(call, "USERNAME");
    if username.is_empty() {
        return Ok(returning(vec![user_message(
            Severity::Error,
            "155",
            "Enter a user name".to_string(),
        )]));
    }
    if system.user(&username).is_some() {
        return Ok(returning(vec![user_message(
            Severity::Error,
            "087",
            format!("User {} already exists", username),
        )]));
    }

    let mut address = blank(ADDRESS_FIELDS);
    merge(&mut address, call.structures.get("ADDRESS"), None);
    let mut logon = blank(LOGON_FIELDS);
    merge(&mut logon, call.structures.get("LOGONDATA"), None);
    let password = call
        .structures
        .get("PASSWORD")
        .and_then(|p| p.text("BAPIPWD"))
        .unwrap_or_default();

    pending.push(Change::PutUser(
        username.clone(),
        UserRecord {
            address,
            logon,
            password,
            roles: Vec::new(),
        },
    ));
    Ok(returning(vec![user_message(
        Severity::Success,
        "102",
        format!("User {} created", username),
    )]))
}

fn user_get_detail(system: &SimulatedSystem, call: &FunctionCall) -> RfcResult<FunctionResponse> {
    let username = scalar(call, "USERNAME");
    let Some(user) = system.user(&username) else {
        return Ok(user_missing(&username));
    };

    let mut response = returning(Vec::new());
    response.structures.insert("ADDRESS".to_string(), user.address);
    response.structures.insert("LOGONDATA".to_string(), user.logon);
    let groups = user
        .roles
        .iter()
        .map(|role| {
            let mut row = blank(ACTIVITY_GROUP_FIELDS);
            row.set("AGR_NAME", role.as_str());
            row
        })
        .collect();
    response.tables.insert("ACTIVITYGROUPS".to_string(), groups);
    Ok(response)
}

fn user_change(
    system: &SimulatedSystem,
    pending: &mut Vec<Change>,
    call: &FunctionCall,
) -> RfcResult<FunctionResponse> {
    let username = scalar(call, "USERNAME");
    let Some(mut user) = system.user(&username) else {
        return Ok(user_missing(&username));
    };

    let no_flags = FieldSet::new();
    merge(
        &mut user.address,
        call.structures.get("ADDRESS"),
        Some(call.structures.get("ADDRESSX").unwrap_or(&no_flags)),
    );
    merge(
        &mut user.logon,
        call.structures.get("LOGONDATA"),
        Some(call.structures.get("LOGONDATAX").unwrap_or(&no_flags)),
    );

    pending.push(Change::PutUser(username.clone(), user));
    Ok(returning(vec![user_message(
        Severity::Success,
        "039",
        format!("User {} changed", username),
    )]))
}

/// Classic function module: no `RETURN`, failures are exceptions
fn user_delete(
    system: &SimulatedSystem,
    pending: &mut Vec<Change>,
    call: &FunctionCall,
) -> RfcResult<FunctionResponse> {
    let username = scalar(call, "USER_NAME");
    if system.user(&username).is_none() {
        return Err(RfcError::RemoteRuntime(format!(
            "USER_NOT_FOUND: {}",
            username
        )));
    }

    pending.push(Change::RemoveUser(username));
    Ok(FunctionResponse::default())
}

fn flight_getlist(system: &SimulatedSystem, call: &FunctionCall) -> RfcResult<FunctionResponse> {
    let airline = scalar(call, "AIRLINE");
    let max_rows = call
        .scalars
        .get("MAX_ROWS")
        .and_then(|v| match v {
            FieldValue::Integer(n) => Some(*n),
            other => other.as_str().and_then(|s| s.parse().ok()),
        })
        .filter(|n| *n > 0)
        .map(|n| n as usize);

    let rows: Vec<FieldSet> = system.read(|state| {
        state
            .flights
            .iter()
            .filter(|f| {
                airline.is_empty() || f.text("AIRLINEID").as_deref() == Some(airline.as_str())
            })
            .take(max_rows.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    });

    let mut response = returning(Vec::new());
    response.tables.insert("FLIGHT_LIST".to_string(), rows);
    Ok(response)
}
