//! Request body extractor for policy handlers.

use axum::extract::FromRequest;

use crate::error::ApiError;

/// [`axum::Json`] for request bodies, rejecting malformed or mistyped JSON
/// with a 400 and the usual `{"error": ...}` payload instead of axum's
/// plain-text 422.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
