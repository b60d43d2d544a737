use async_trait::async_trait;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,
    #[error("Invalid authentication token")]
    InvalidToken,
    #[error("Token was issued for a different audience")]
    AudienceMismatch,
    #[error("Identity provider unavailable (status {0})")]
    ProviderUnavailable(u16),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

/// Verifies an externally issued identity token.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    aud: Option<String>,
}

/// Delegates verification to a `tokeninfo`-style endpoint of the identity provider.
#[derive(Clone)]
pub struct TokenInfoVerifier {
    client: reqwest::Client,
    verify_url: Url,
    audience: Option<String>,
}

impl TokenInfoVerifier {
    pub fn new(verify_url: Url, audience: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            verify_url,
            audience,
        }
    }
}

#[async_trait]
impl IdentityVerifier for TokenInfoVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let mut url = self.verify_url.clone();
        url.query_pairs_mut().append_pair("id_token", token);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status.is_server_error() {
            tracing::warn!(%status, "identity provider failed");
            return Err(AuthError::ProviderUnavailable(status.as_u16()));
        }
        if !status.is_success() {
            tracing::debug!(%status, "identity provider rejected token");
            return Err(AuthError::InvalidToken);
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|_| AuthError::InvalidToken)?;

        if let Some(expected) = &self.audience
            && info.aud.as_deref() != Some(expected.as_str())
        {
            return Err(AuthError::AudienceMismatch);
        }

        Ok(Identity {
            user_id: info.sub,
            email: info.email,
        })
    }
}

/// Resolves the bearer header into a verified identity.
pub async fn authenticate(
    verifier: &dyn IdentityVerifier,
    auth: Option<Authorization<Bearer>>,
) -> Result<Identity, ApiError> {
    let token = auth
        .map(|a| a.token().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;
    let identity = verifier.verify(&token).await?;
    tracing::info!(user_id = %identity.user_id, "authenticated request");
    Ok(identity)
}
