//! JSON extractor that also runs `validator` rules.

use async_trait::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::LoginError;

/// Deserialized and validated JSON body.
///
/// Rejects with [`LoginError::MalformedBody`] when the body is not JSON of
/// the right shape, and with [`LoginError::Validation`] when a field rule
/// fails. Either way the handler never runs.
#[derive(Debug, Clone)]
pub struct Valid<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = LoginError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}
