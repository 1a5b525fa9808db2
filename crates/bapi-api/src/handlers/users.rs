//! User administration handlers (`BAPI_USER_*`)
//!
//! Usernames are upper-cased before every remote call; the backend stores
//! them that way and looks them up case-sensitively.

use axum::extract::{Path, State};
use axum::Json;
use bapi_core::projection::{fields_from, patch_from, project_into};
use bapi_core::{BindingKind, FieldBinding, FieldSet, FunctionCall, Message};
use serde::{Deserialize, Serialize};

use super::{ApiJson, WriteResponse};
use crate::error::ApiError;
use crate::state::AppState;

pub const USER_CREATE: &str = "BAPI_USER_CREATE1";
pub const USER_GET_DETAIL: &str = "BAPI_USER_GET_DETAIL";
pub const USER_CHANGE: &str = "BAPI_USER_CHANGE";

/// Fixed logon data for users created through the API
const DIALOG_USER_TYPE: &str = "A";
const DEFAULT_USER_GROUP: &str = "DEFAULT";

/// Address and logon fields of a user
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UserFields {
    #[serde(default, alias = "FirstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, alias = "LastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, alias = "Email", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, alias = "Department", skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// `YYYYMMDD` or `YYYY-MM-DD`
    #[serde(default, alias = "ValidFrom", skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<String>,
    #[serde(default, alias = "ValidTo", skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<String>,
}

/// `ADDRESS` (`BAPIADDR3`)
const ADDRESS: &[FieldBinding<UserFields>] = &[
    FieldBinding {
        remote: "FIRSTNAME",
        kind: BindingKind::Text,
        get: |u| u.first_name.as_deref(),
        set: |u, v| u.first_name = Some(v),
    },
    FieldBinding {
        remote: "LASTNAME",
        kind: BindingKind::Text,
        get: |u| u.last_name.as_deref(),
        set: |u, v| u.last_name = Some(v),
    },
    FieldBinding {
        remote: "E_MAIL",
        kind: BindingKind::Text,
        get: |u| u.email.as_deref(),
        set: |u, v| u.email = Some(v),
    },
    FieldBinding {
        remote: "DEPARTMENT",
        kind: BindingKind::Text,
        get: |u| u.department.as_deref(),
        set: |u, v| u.department = Some(v),
    },
];

/// `LOGONDATA` (`BAPILOGOND`)
const LOGON: &[FieldBinding<UserFields>] = &[
    FieldBinding {
        remote: "GLTGV",
        kind: BindingKind::Date,
        get: |u| u.valid_from.as_deref(),
        set: |u, v| u.valid_from = Some(v),
    },
    FieldBinding {
        remote: "GLTGB",
        kind: BindingKind::Date,
        get: |u| u.valid_to.as_deref(),
        set: |u, v| u.valid_to = Some(v),
    },
];

/// Request to create a user
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(alias = "Username")]
    pub username: String,
    #[serde(default, alias = "Password")]
    pub password: Option<String>,
    #[serde(flatten)]
    pub fields: UserFields,
}

/// Response for a single user
#[derive(Debug, Serialize)]
pub struct UserDetail {
    pub username: String,
    #[serde(flatten)]
    pub fields: UserFields,
    pub user_type: String,
    /// Assigned roles (activity groups)
    pub roles: Vec<String>,
    pub messages: Vec<Message>,
}

fn normalize_username(username: &str) -> Result<String, ApiError> {
    let username = username.trim().to_uppercase();
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username must not be empty".to_string()));
    }
    Ok(username)
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<Json<WriteResponse>, ApiError> {
    let username = normalize_username(&request.username)?;

    let address = fields_from(&request.fields, ADDRESS)?;
    let mut logon = fields_from(&request.fields, LOGON)?;
    logon.set("USTYP", DIALOG_USER_TYPE);
    logon.set("CLASS", DEFAULT_USER_GROUP);

    let mut call = FunctionCall::new(USER_CREATE)
        .scalar("USERNAME", username.as_str())
        .structure("LOGONDATA", logon)
        .structure("ADDRESS", address);
    if let Some(password) = request.password.filter(|p| !p.is_empty()) {
        call = call.structure("PASSWORD", FieldSet::new().with("BAPIPWD", password));
    }

    let result = state.transact(call).await?;
    Ok(Json(WriteResponse {
        id: username,
        committed: true,
        messages: result.messages,
    }))
}

/// GET /users/{username}
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserDetail>, ApiError> {
    let username = normalize_username(&username)?;
    let call = FunctionCall::new(USER_GET_DETAIL).scalar("USERNAME", username.as_str());

    let result = state.read(call).await?;
    let logon = result.structure("LOGONDATA")?;

    let mut fields = UserFields::default();
    project_into(&mut fields, USER_GET_DETAIL, result.structure("ADDRESS")?, ADDRESS)?;
    project_into(&mut fields, USER_GET_DETAIL, logon, LOGON)?;

    let roles = result
        .table("ACTIVITYGROUPS")?
        .iter()
        .filter_map(|row| row.text("AGR_NAME"))
        .filter(|name| !name.is_empty())
        .collect();

    Ok(Json(UserDetail {
        username,
        fields,
        user_type: logon.text("USTYP").unwrap_or_default(),
        roles,
        messages: result.messages,
    }))
}

/// PUT /users/{username}
/// Change only the provided address and logon fields
pub async fn update_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    ApiJson(fields): ApiJson<UserFields>,
) -> Result<Json<WriteResponse>, ApiError> {
    let username = normalize_username(&username)?;
    let address = patch_from(&fields, ADDRESS)?;
    let logon = patch_from(&fields, LOGON)?;
    if address.is_empty() && logon.is_empty() {
        return Err(ApiError::BadRequest("No fields to change".to_string()));
    }

    let mut call = FunctionCall::new(USER_CHANGE).scalar("USERNAME", username.as_str());
    if !address.is_empty() {
        call = call.change("ADDRESS", "ADDRESSX", address);
    }
    if !logon.is_empty() {
        call = call.change("LOGONDATA", "LOGONDATAX", logon);
    }

    let result = state.transact(call).await?;
    Ok(Json(WriteResponse {
        id: username,
        committed: true,
        messages: result.messages,
    }))
}

/// DELETE /users/{username}
/// Runs the configured delete function inside the commit/rollback envelope
pub async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<WriteResponse>, ApiError> {
    let username = normalize_username(&username)?;
    let call =
        FunctionCall::new(state.user_delete_function()).scalar("USER_NAME", username.as_str());

    let result = state.transact(call).await?;
    Ok(Json(WriteResponse {
        id: username,
        committed: true,
        messages: result.messages,
    }))
}
