//! Request extractors whose rejections render as tagged failure bodies

use axum::extract::FromRequest;

use crate::error::ApiError;

/// `axum::Json` whose rejection is an [`ApiError`] rather than plain text
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
