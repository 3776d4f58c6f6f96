//! Credential verification seam for the gateway.
//!
//! The gateway never issues or decodes credentials itself; verification is
//! delegated to the platform auth service, which resolves a bearer token to
//! the actor it was issued for.

use async_trait::async_trait;
use event_schema::ActorId;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential rejected")]
    Rejected,

    #[error("auth service unreachable: {0}")]
    Unreachable(String),
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verify a bearer credential and resolve the actor it belongs to.
    async fn verify(&self, token: &str) -> Result<ActorId, AuthError>;
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    user_id: Uuid,
}

/// Delegates verification to the auth service over HTTP.
#[derive(Clone)]
pub struct HttpCredentialVerifier {
    client: reqwest::Client,
    verify_url: String,
}

impl HttpCredentialVerifier {
    pub fn new(auth_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap_or_default();

        Self {
            client,
            verify_url: format!("{}/internal/auth/verify", auth_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl CredentialVerifier for HttpCredentialVerifier {
    async fn verify(&self, token: &str) -> Result<ActorId, AuthError> {
        let response = self
            .client
            .get(&self.verify_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: VerifyResponse = response
                .json()
                .await
                .map_err(|e| AuthError::Unreachable(e.to_string()))?;
            Ok(ActorId::from(body.user_id))
        } else if status.is_client_error() {
            Err(AuthError::Rejected)
        } else {
            Err(AuthError::Unreachable(format!(
                "auth service returned {}",
                status
            )))
        }
    }
}
