//! Business partner handlers (`BAPI_EPM_BP_*`)

use axum::extract::{Path, State};
use axum::Json;
use bapi_core::projection::{fields_from, patch_from, project};
use bapi_core::{BindingKind, FieldBinding, FunctionCall, Message};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ApiJson, WriteResponse};
use crate::error::ApiError;
use crate::state::AppState;

pub const BP_CREATE: &str = "BAPI_EPM_BP_CREATE";
pub const BP_GET_DETAIL: &str = "BAPI_EPM_BP_GET_DETAIL";
pub const BP_CHANGE: &str = "BAPI_EPM_BP_CHANGE";
pub const BP_DELETE: &str = "BAPI_EPM_BP_DELETE";

/// Header fields of a business partner (`BAPI_EPM_BP_HEADER`)
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BusinessPartner {
    #[serde(default, alias = "BpRole", skip_serializing_if = "Option::is_none")]
    pub bp_role: Option<String>,
    #[serde(default, alias = "Email", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, alias = "Phone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, alias = "Fax", skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
    #[serde(default, alias = "WebAddress", skip_serializing_if = "Option::is_none")]
    pub web_address: Option<String>,
    #[serde(default, alias = "Company", skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, alias = "LegalForm", skip_serializing_if = "Option::is_none")]
    pub legal_form: Option<String>,
    #[serde(default, alias = "Currency", skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, alias = "City", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, alias = "PostalCode", skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, alias = "Street", skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, alias = "Building", skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(default, alias = "Country", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, alias = "AddressType", skip_serializing_if = "Option::is_none")]
    pub address_type: Option<String>,
}

const HEADER: &[FieldBinding<BusinessPartner>] = &[
    FieldBinding {
        remote: "BP_ROLE",
        kind: BindingKind::Text,
        get: |p| p.bp_role.as_deref(),
        set: |p, v| p.bp_role = Some(v),
    },
    FieldBinding {
        remote: "EMAIL_ADDRESS",
        kind: BindingKind::Text,
        get: |p| p.email.as_deref(),
        set: |p, v| p.email = Some(v),
    },
    FieldBinding {
        remote: "PHONE_NUMBER",
        kind: BindingKind::Text,
        get: |p| p.phone.as_deref(),
        set: |p, v| p.phone = Some(v),
    },
    FieldBinding {
        remote: "FAX_NUMBER",
        kind: BindingKind::Text,
        get: |p| p.fax.as_deref(),
        set: |p, v| p.fax = Some(v),
    },
    FieldBinding {
        remote: "WEB_ADDRESS",
        kind: BindingKind::Text,
        get: |p| p.web_address.as_deref(),
        set: |p, v| p.web_address = Some(v),
    },
    FieldBinding {
        remote: "COMPANY_NAME",
        kind: BindingKind::Text,
        get: |p| p.company.as_deref(),
        set: |p, v| p.company = Some(v),
    },
    FieldBinding {
        remote: "LEGAL_FORM",
        kind: BindingKind::Text,
        get: |p| p.legal_form.as_deref(),
        set: |p, v| p.legal_form = Some(v),
    },
    FieldBinding {
        remote: "CURRENCY_CODE",
        kind: BindingKind::Text,
        get: |p| p.currency.as_deref(),
        set: |p, v| p.currency = Some(v),
    },
    FieldBinding {
        remote: "CITY",
        kind: BindingKind::Text,
        get: |p| p.city.as_deref(),
        set: |p, v| p.city = Some(v),
    },
    FieldBinding {
        remote: "POSTAL_CODE",
        kind: BindingKind::Text,
        get: |p| p.postal_code.as_deref(),
        set: |p, v| p.postal_code = Some(v),
    },
    FieldBinding {
        remote: "STREET",
        kind: BindingKind::Text,
        get: |p| p.street.as_deref(),
        set: |p, v| p.street = Some(v),
    },
    FieldBinding {
        remote: "BUILDING",
        kind: BindingKind::Text,
        get: |p| p.building.as_deref(),
        set: |p, v| p.building = Some(v),
    },
    FieldBinding {
        remote: "COUNTRY",
        kind: BindingKind::Text,
        get: |p| p.country.as_deref(),
        set: |p, v| p.country = Some(v),
    },
    FieldBinding {
        remote: "ADDRESS_TYPE",
        kind: BindingKind::Text,
        get: |p| p.address_type.as_deref(),
        set: |p, v| p.address_type = Some(v),
    },
];

/// Response for a single business partner
#[derive(Debug, Serialize)]
pub struct PartnerDetail {
    pub id: String,
    #[serde(flatten)]
    pub partner: BusinessPartner,
    pub messages: Vec<Message>,
}

fn partner_id(id: String) -> Result<String, ApiError> {
    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(ApiError::BadRequest(
            "Business partner id must not be empty".to_string(),
        ));
    }
    Ok(id)
}

/// POST /business-partners
/// Create a business partner from the provided header fields
pub async fn create_partner(
    State(state): State<AppState>,
    ApiJson(partner): ApiJson<BusinessPartner>,
) -> Result<Json<WriteResponse>, ApiError> {
    let header = fields_from(&partner, HEADER)?;
    let call = FunctionCall::new(BP_CREATE).structure("HEADERDATA", header);

    let result = state.transact(call).await?;
    let id = result.export("BUSINESSPARTNERID")?.to_string();
    if id.trim().is_empty() {
        warn!(function = BP_CREATE, "Committed create exported no business partner id");
    }

    Ok(Json(WriteResponse {
        id,
        committed: true,
        messages: result.messages,
    }))
}

/// GET /business-partners/{id}
pub async fn get_partner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PartnerDetail>, ApiError> {
    let id = partner_id(id)?;
    let call = FunctionCall::new(BP_GET_DETAIL).scalar("BP_ID", id.as_str());

    let result = state.read(call).await?;
    let header = result.structure("HEADERDATA")?;
    let partner = project(BP_GET_DETAIL, header, HEADER)?;

    Ok(Json(PartnerDetail {
        id: header.text("BP_ID").filter(|s| !s.is_empty()).unwrap_or(id),
        partner,
        messages: result.messages,
    }))
}

/// PUT /business-partners/{id}
/// Change only the provided header fields
pub async fn update_partner(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(partner): ApiJson<BusinessPartner>,
) -> Result<Json<WriteResponse>, ApiError> {
    let id = partner_id(id)?;
    let patch = patch_from(&partner, HEADER)?;
    if patch.is_empty() {
        return Err(ApiError::BadRequest("No fields to change".to_string()));
    }

    let call = FunctionCall::new(BP_CHANGE)
        .scalar("BP_ID", id.as_str())
        .change("HEADERDATA", "HEADERDATAX", patch);

    let result = state.transact(call).await?;
    Ok(Json(WriteResponse {
        id,
        committed: true,
        messages: result.messages,
    }))
}

/// DELETE /business-partners/{id}
pub async fn delete_partner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WriteResponse>, ApiError> {
    let id = partner_id(id)?;
    let call = FunctionCall::new(BP_DELETE).scalar("BP_ID", id.as_str());

    let result = state.transact(call).await?;
    Ok(Json(WriteResponse {
        id,
        committed: true,
        messages: result.messages,
    }))
}
