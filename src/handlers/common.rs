use crate::errors::ServiceError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use utoipa::IntoParams;

/// `Json` whose rejections surface as 400 validation errors in the standard error body.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::ValidationError(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// `Path` whose rejections (e.g. a malformed order id) surface as 400s in the standard error body.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathParam<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ServiceError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// `Query` counterpart of [`PathParam`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ServiceError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string of the admin order listing.
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AdminOrderParams {
    /// 1-based page number (default 1)
    #[serde(default, deserialize_with = "lenient_u64")]
    pub page: Option<u64>,
    /// Page size (default and cap come from configuration)
    #[serde(default, deserialize_with = "lenient_u64")]
    pub limit: Option<u64>,
    /// Case-insensitive substring of the owner's name
    #[serde(default)]
    pub search_term: Option<String>,
    /// `true` or `false`; anything else means no filter
    #[serde(default)]
    pub is_pickup_ready_filter: Option<String>,
}

impl AdminOrderParams {
    pub fn pickup_ready(&self) -> Option<bool> {
        match self.is_pickup_ready_filter.as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("true") => Some(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }
}

// Storefront clients send `page=` with an empty value; treat that as absent.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
