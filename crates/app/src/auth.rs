use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use placement_core::types::Account;
use placement_core::{Actor, Role};

use crate::router::AppState;
use crate::workflow::WorkflowError;

const MAX_TTL_SECS: u64 = 10 * 365 * 86_400;

/// Issues and checks HS256 bearer tokens shared with the identity provider.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        // Expiry is checked against the injected clock, not the system time.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64),
        }
    }

    pub fn issue(&self, account: &Account, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let expires_at = now + self.ttl;
        let claims = TokenClaims {
            sub: account.id.to_string(),
            role: account.role,
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| TokenError::Encode(err.to_string()))?;
        Ok(IssuedToken { token, expires_at })
    }

    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| TokenError::Invalid(err.to_string()))?
            .claims;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Invalid("token_expired".to_string()));
        }
        Ok(claims)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Account id.
    pub sub: String,
    pub role: Role,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("failed to sign token: {0}")]
    Encode(String),
}

/// Resolves the bearer token on `headers` to the acting account.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Actor, WorkflowError> {
    let token = bearer_token(headers).ok_or(WorkflowError::Unauthenticated("missing bearer token"))?;
    let claims = state.tokens().validate(token, state.now()).map_err(|err| {
        warn!(stage = "auth", error = %err, "bearer token rejected");
        WorkflowError::Unauthenticated("invalid or expired token")
    })?;
    let account_id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| WorkflowError::Unauthenticated("invalid token subject"))?;
    state.service().resolve_actor(account_id, claims.role).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
