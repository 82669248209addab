//! Backend endpoints the session layer talks to.

use async_trait::async_trait;
use thiserror::Error;

use clinica_core::{IdentityPayload, UserId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// The backend rejected the session (401/403).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401 | 403, .. })
    }
}

/// Identity-related endpoints.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// `GET /user`: who the current session belongs to.
    async fn current_user(&self) -> Result<IdentityPayload, ApiError>;

    /// `PATCH /usuarios/{id}/duracion` with `{duracion_turno}`.
    async fn update_slot_duration(&self, user: UserId, minutes: u32) -> Result<(), ApiError>;

    /// `POST /logout`.
    async fn logout(&self) -> Result<(), ApiError>;
}

#[cfg(feature = "http")]
pub use http::HttpIdentityApi;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use clinica_core::{IdentityPayload, UserId};

    use super::{ApiError, IdentityApi};

    /// Cookie-session HTTP client for the identity endpoints.
    #[derive(Debug, Clone)]
    pub struct HttpIdentityApi {
        base_url: String,
        client: reqwest::Client,
    }

    impl HttpIdentityApi {
        pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
            let client = reqwest::Client::builder()
                .cookie_store(true)
                .timeout(timeout)
                .build()
                .map_err(|e| ApiError::Network(e.to_string()))?;
            Ok(Self {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                client,
            })
        }

        pub fn base_url(&self) -> &str {
            &self.base_url
        }

        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base_url, path)
        }

        async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
            if resp.status().is_success() {
                return Ok(resp);
            }
            let status = resp.status().as_u16();
            Err(ApiError::Status {
                status,
                body: resp.text().await.unwrap_or_default(),
            })
        }
    }

    #[async_trait]
    impl IdentityApi for HttpIdentityApi {
        async fn current_user(&self) -> Result<IdentityPayload, ApiError> {
            let resp = self
                .client
                .get(self.url("/user"))
                .send()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?;
            let resp = Self::check(resp).await?;
            resp.json::<IdentityPayload>()
                .await
                .map_err(|e| ApiError::Parse(e.to_string()))
        }

        async fn update_slot_duration(&self, user: UserId, minutes: u32) -> Result<(), ApiError> {
            let resp = self
                .client
                .patch(self.url(&format!("/usuarios/{user}/duracion")))
                .json(&json!({ "duracion_turno": minutes }))
                .send()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?;
            Self::check(resp).await.map(|_| ())
        }

        async fn logout(&self) -> Result<(), ApiError> {
            let resp = self
                .client
                .post(self.url("/logout"))
                .json(&json!({}))
                .send()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?;
            Self::check(resp).await.map(|_| ())
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_statuses_are_recognized() {
        let err = ApiError::Status {
            status: 401,
            body: String::new(),
        };
        assert!(err.is_unauthorized());
        assert!(!ApiError::Network("down".into()).is_unauthorized());
    }
}
