//! Token issuance, validation, and revocation.
//!
//! Tokens are HMAC-signed JWTs carrying `{sub, iat, exp}`. Validity has two
//! legs: the signature/expiry check done by `jsonwebtoken`, and a presence
//! check against the [`TokenStore`] — which is what makes `destroy_token`
//! (logout) take effect immediately. Every token-validity failure is reported
//! uniformly as `InvalidToken`; only a store backend failure surfaces as
//! `Backend`.

pub mod store;

use crate::config::{AuthConfig, RedisConfig, StoreBackend};
use crate::error::{GateError, Result};
use crate::schema::TokenInfo;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use store::{MemoryStore, RedisStore, TokenStore};

const TOKEN_TYPE: &str = "Bearer";

// ═══════════════════════════════════════════════════════════════════════════════
// Claims
// ═══════════════════════════════════════════════════════════════════════════════

/// JWT claim set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Token Service
// ═══════════════════════════════════════════════════════════════════════════════

/// JWT mint/parse/revoke, bridged to a [`TokenStore`].
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    validation: Validation,
    expiry: Duration,
    store: Arc<dyn TokenStore>,
}

impl JwtAuth {
    /// Build from configuration, constructing the configured store backend.
    pub fn from_config(auth: &AuthConfig, redis: &RedisConfig) -> Result<Self> {
        let store: Arc<dyn TokenStore> = match auth.store {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Redis => {
                Arc::new(RedisStore::new(&redis.url, redis.key_prefix.clone())?)
            }
        };
        Self::new(auth, store)
    }

    /// Build with an explicit store.
    pub fn new(auth: &AuthConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let algorithm = match auth.signing_method.as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => {
                return Err(GateError::backend(format!(
                    "unsupported signing method: {}",
                    other
                )))
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(auth.signing_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(auth.signing_key.as_bytes()),
            algorithm,
            validation,
            expiry: Duration::from_secs(auth.expired_secs),
            store,
        })
    }

    /// Issue a token for `user_id` and register it in the store.
    pub async fn generate_token(&self, user_id: &str) -> Result<TokenInfo> {
        let now = Utc::now().timestamp();
        let expires_at = now + self.expiry.as_secs() as i64;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: expires_at,
        };

        let token = jsonwebtoken::encode(
            &Header::new(self.algorithm),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| GateError::backend("token signing failed").with_source(e))?;

        self.store.set(&token, self.expiry).await?;
        counter!("gatekit_tokens_issued_total").increment(1);
        debug!(user_id = %user_id, "token issued");

        Ok(TokenInfo {
            access_token: token,
            token_type: TOKEN_TYPE.to_string(),
            expires_at,
        })
    }

    /// Validate a token and recover the subject id.
    ///
    /// Malformed, expired, tampered, and revoked tokens are all rejected with
    /// the same error kind.
    pub async fn parse_user_id(&self, token: &str) -> Result<String> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| GateError::invalid_token())?;

        match self.store.check(token).await {
            Ok(true) => Ok(data.claims.sub),
            Ok(false) => Err(GateError::invalid_token()),
            Err(e) => Err(e),
        }
    }

    /// Revoke a token. Revoking an unknown token is not an error.
    pub async fn destroy_token(&self, token: &str) -> Result<()> {
        self.store.delete(token).await?;
        counter!("gatekit_tokens_revoked_total").increment(1);
        Ok(())
    }

    /// Token lifetime, as configured.
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Release the underlying store.
    pub async fn release(&self) -> Result<()> {
        self.store.close().await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
