use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use tokio::sync::watch;

use storyloom_common::{decrypt, encrypt, get_current_timestamp};

/// An authenticated identity making a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

impl Principal {
    pub fn new(id: Uuid) -> Self {
        Self { id, email: None, full_name: None }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Full name, else the local part of the email, else "Anonymous".
    pub fn display_name(&self) -> String {
        if let Some(name) = self.full_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return name.to_string();
        }

        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or("Anonymous")
            .to_string()
    }
}

/// Resolves a bearer token into the principal it identifies.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` for tokens that are malformed, expired or otherwise unusable.
    async fn resolve(&self, token: &str) -> Result<Option<Principal>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub timestamp: i64,
}

/// Tokens are sealed JSON claims, minted by the sign-in callback with a shared secret.
#[derive(Clone)]
pub struct SealedTokenProvider {
    secret: String,
    ttl_secs: i64,
}

impl SealedTokenProvider {
    pub fn new(secret: impl Into<String>, ttl_secs: i64) -> Self {
        Self { secret: secret.into(), ttl_secs }
    }

    pub fn issue(&self, principal: &Principal) -> Result<String> {
        self.issue_at(principal, get_current_timestamp())
    }

    pub fn issue_at(&self, principal: &Principal, timestamp: i64) -> Result<String> {
        let claims = TokenClaims {
            user_id: principal.id,
            email: principal.email.clone(),
            full_name: principal.full_name.clone(),
            timestamp,
        };
        encrypt(&serde_json::to_string(&claims)?, &self.secret)
    }

    fn open(&self, token: &str) -> Result<TokenClaims> {
        let decrypted = decrypt(token, &self.secret)?;
        Ok(serde_json::from_str::<TokenClaims>(&decrypted)?)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for SealedTokenProvider {
    async fn resolve(&self, token: &str) -> Result<Option<Principal>> {
        let claims = match self.open(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("[SealedTokenProvider::resolve] Rejected token: {}", e);
                return Ok(None);
            }
        };

        if claims.timestamp < get_current_timestamp() - self.ttl_secs {
            tracing::debug!("[SealedTokenProvider::resolve] Token for {} expired", claims.user_id);
            return Ok(None);
        }

        Ok(Some(Principal {
            id: claims.user_id,
            email: claims.email,
            full_name: claims.full_name,
        }))
    }
}

/// Process-wide authentication state.
///
/// Holds one subscription to the identity provider and broadcasts principal changes to
/// every consumer, so screens and tasks read from here instead of each tracking sign-in
/// on their own.
#[derive(Clone)]
pub struct AuthContext {
    provider: Arc<dyn IdentityProvider>,
    state: Arc<watch::Sender<Option<Principal>>>,
}

impl AuthContext {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(None);
        Self { provider, state: Arc::new(state) }
    }

    /// Resolves `token` and publishes the result. An unusable token signs the context out.
    pub async fn sign_in(&self, token: &str) -> Result<Option<Principal>> {
        let principal = self.provider.resolve(token).await?;
        self.state.send_replace(principal.clone());
        Ok(principal)
    }

    pub fn sign_out(&self) {
        self.state.send_replace(None);
    }

    pub fn current(&self) -> Option<Principal> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.state.subscribe()
    }
}
