//! HTTP handlers for the REST facade

pub mod business_partners;
pub mod flights;
pub mod users;

use axum::extract::{FromRequest, FromRequestParts};
use bapi_core::Message;
use serde::Serialize;

use crate::error::ApiError;

/// JSON body extractor whose rejections are reported as [`ApiError::BadRequest`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor with the same error reporting as [`ApiJson`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Response of every successful mutating route
#[derive(Debug, Serialize)]
pub struct WriteResponse {
    /// Key of the affected record
    pub id: String,
    pub committed: bool,
    /// All backend messages, in backend order
    pub messages: Vec<Message>,
}
