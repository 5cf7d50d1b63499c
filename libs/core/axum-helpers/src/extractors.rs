//! Request extractors that reject with the workspace error body.

use axum::{
    extract::{FromRequest, FromRequestParts, Json, Path, Query, Request},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::server::error_body;

/// JSON extractor with automatic validation.
///
/// Malformed JSON and failed `Validate` checks both answer 400 with
/// `{"error": .., "code": 400}`; validation failures add per-field `details`.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| error_body(StatusCode::BAD_REQUEST, e.body_text()).into_response())?;

        data.validate().map_err(validation_failed)?;

        Ok(ValidatedJson(data))
    }
}

/// Query-string extractor with automatic validation.
///
/// Undecodable parameters and failed `Validate` checks answer the same JSON
/// 400 as [`ValidatedJson`].
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(data) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| error_body(StatusCode::BAD_REQUEST, e.body_text()).into_response())?;

        data.validate().map_err(validation_failed)?;
        Ok(ValidatedQuery(data))
    }
}

fn validation_failed(errors: ValidationErrors) -> Response {
    let details = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let codes: Vec<serde_json::Value> =
                errors.iter().map(|err| serde_json::json!(err.code)).collect();
            (field.to_string(), serde_json::json!(codes))
        })
        .collect::<serde_json::Map<_, _>>();

    let mut body = error_body(StatusCode::BAD_REQUEST, "Request validation failed");
    body.1.0["details"] = serde_json::Value::Object(details);
    body.into_response()
}

/// Extractor for a single UUID path parameter
pub struct UuidPath(pub Uuid);

impl<S> FromRequestParts<S> for UuidPath
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| e.into_response())?;

        Uuid::parse_str(&id).map(UuidPath).map_err(|_| {
            error_body(StatusCode::BAD_REQUEST, format!("Invalid UUID: {}", id)).into_response()
        })
    }
}
