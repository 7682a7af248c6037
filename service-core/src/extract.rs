//! Request extractors whose rejections go through [`AppError`].
//!
//! Axum's own `Json` and `Query` reject with plain-text bodies. These decode
//! the same input but report failures as JSON `fields`, naming the offending
//! key whenever the target type lets us find it.

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{HeaderMap, header, request::Parts},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{AppError, FieldErrors};

/// JSON form body. Decode failures are [`AppError::InvalidInput`] (400).
pub struct FormJson<T>(pub T);

/// JSON command body. Decode failures are [`AppError::ValidationError`] (422).
pub struct CommandJson<T>(pub T);

/// Query string filter. Decode failures are [`AppError::ValidationError`] (422).
pub struct FilterQuery<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for FormJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        read_json(req, state)
            .await
            .map(FormJson)
            .map_err(AppError::InvalidInput)
    }
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for CommandJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        read_json(req, state)
            .await
            .map(CommandJson)
            .map_err(AppError::ValidationError)
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for FilterQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        decode_query(parts.uri.query().unwrap_or_default())
            .map(FilterQuery)
            .map_err(AppError::ValidationError)
    }
}

async fn read_json<T, S>(req: Request, state: &S) -> Result<T, FieldErrors>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    if !is_json(req.headers()) {
        return Err(FieldErrors::single(
            "body",
            "Expected request with `Content-Type: application/json`",
        ));
    }

    let bytes = Bytes::from_request(req, state)
        .await
        .map_err(|e| FieldErrors::single("body", e.body_text()))?;
    decode_json(&bytes)
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, FieldErrors> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| FieldErrors::single("body", e.to_string()))?;

    T::deserialize(&value).map_err(|err| {
        blame_json_keys::<T>(&value).unwrap_or_else(|| FieldErrors::single("body", err.to_string()))
    })
}

/// Decode every top-level key on its own to find the ones at fault.
///
/// Only possible when an empty object decodes, that is when every field of
/// `T` is optional. Otherwise `None`, and the caller reports the whole body.
fn blame_json_keys<T: DeserializeOwned>(value: &Value) -> Option<FieldErrors> {
    let object = value.as_object()?;
    T::deserialize(&Value::Object(Map::new())).ok()?;

    let mut errors = FieldErrors::new();
    for (key, field) in object {
        let single = Value::Object(Map::from_iter([(key.clone(), field.clone())]));
        if let Err(err) = T::deserialize(&single) {
            errors.add(key.as_str(), err.to_string());
        }
    }
    (!errors.is_empty()).then_some(errors)
}

fn decode_query<T: DeserializeOwned>(query: &str) -> Result<T, FieldErrors> {
    serde_urlencoded::from_str::<T>(query).map_err(|err| {
        blame_query_keys::<T>(query)
            .unwrap_or_else(|| FieldErrors::single("query", err.to_string()))
    })
}

/// Query counterpart of [`blame_json_keys`]: each pair is re-encoded and
/// decoded alone.
fn blame_query_keys<T: DeserializeOwned>(query: &str) -> Option<FieldErrors> {
    serde_urlencoded::from_str::<T>("").ok()?;
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).ok()?;

    let mut errors = FieldErrors::new();
    for (key, value) in &pairs {
        let single = serde_urlencoded::to_string([(key, value)]).ok()?;
        if let Err(err) = serde_urlencoded::from_str::<T>(&single) {
            errors.add(key.as_str(), err.to_string());
        }
    }
    (!errors.is_empty()).then_some(errors)
}
