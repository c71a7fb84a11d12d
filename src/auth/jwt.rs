use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{Claims, TokenKind, TokenPair};
use crate::config::JwtConfig;

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }
}

/// Signs and verifies both token kinds. Access and refresh tokens use
/// separate secrets, so a leaked access secret cannot mint refresh tokens.
#[derive(Clone)]
pub struct JwtKeys {
    access: SigningKeys,
    refresh: SigningKeys,
    issuer: String,
    audience: String,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            access: SigningKeys::new(&cfg.access_secret, cfg.access_ttl_minutes),
            refresh: SigningKeys::new(&cfg.refresh_secret, cfg.refresh_ttl_minutes),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn sign_with_kind(&self, user_id: i64, email: &str, kind: TokenKind) -> anyhow::Result<String> {
        let keys = self.keys(kind);
        let now = OffsetDateTime::now_utc();
        let exp = now + keys.ttl;
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding)?;
        debug!(user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: i64, email: &str) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, email, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user_id: i64, email: &str) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, email, TokenKind::Refresh)
    }

    /// Mints both tokens; either both are returned or neither is.
    pub fn issue_pair(&self, user_id: i64, email: &str) -> anyhow::Result<TokenPair> {
        let access_token = self.sign_access(user_id, email)?;
        let refresh_token = self.sign_refresh(user_id, email)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn verify_with_kind(&self, token: &str, kind: TokenKind) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.keys(kind).decoding, &validation)?;
        if data.claims.kind != kind {
            anyhow::bail!("unexpected token kind");
        }
        debug!(user_id = data.claims.sub, kind = ?kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> anyhow::Result<Claims> {
        self.verify_with_kind(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        self.verify_with_kind(token, TokenKind::Refresh)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> JwtConfig {
    JwtConfig {
        access_secret: "test-access-secret".into(),
        refresh_secret: "test-refresh-secret".into(),
        issuer: "test-issuer".into(),
        audience: "test-aud".into(),
        access_ttl_minutes: 15,
        refresh_ttl_minutes: 60 * 24 * 6,
    }
}
