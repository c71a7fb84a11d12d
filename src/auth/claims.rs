use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of JWT: access or refresh.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT payload shared by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,        // user ID
    pub email: String,
    pub iat: usize,      // issued at (unix timestamp)
    pub exp: usize,      // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
    pub jti: Uuid,       // keeps tokens minted in the same second distinct
}

/// Refresh claims decorated with the raw bearer token they were decoded from.
#[derive(Debug, Clone)]
pub struct RefreshClaims {
    pub claims: Claims,
    pub refresh_token: String,
}

/// Pair handed back by signup, signin and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
