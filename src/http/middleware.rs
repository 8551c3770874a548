//! Authentication middleware and JWT verification

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use crate::app::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by the bearer token. Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (player ID)
    pub sub: Uuid,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Authentication error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("malformed authorization header")]
    Malformed,

    #[error("invalid token")]
    BadSignature,

    #[error("token expired")]
    Expired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Verify an HS256 JWT against the shared secret and extract its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<TokenClaims, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::Malformed);
    }

    // Signature covers `header.payload`
    let message = format!("{}.{}", parts[0], parts[1]);
    let signature = URL_SAFE_NO_PAD
        .decode(parts[2])
        .map_err(|_| AuthError::Malformed)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::BadSignature)?;
    mac.update(message.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AuthError::BadSignature)?;

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| AuthError::Malformed)?;
    let claims: TokenClaims =
        serde_json::from_slice(&payload).map_err(|_| AuthError::Malformed)?;

    if claims.exp <= Utc::now().timestamp() {
        return Err(AuthError::Expired);
    }

    Ok(claims)
}

/// Extract the JWT from an Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// The player a verified token belongs to. The acting player for every
/// operation comes from here, never from a request body.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedPlayer {
    pub id: Uuid,
}

/// Middleware guarding the match routes
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingHeader)?;

    let token = extract_bearer_token(auth_header).ok_or(AuthError::Malformed)?;
    let claims = verify_token(token, &state.config.jwt_secret)?;

    // Handlers read the player out of request extensions
    request
        .extensions_mut()
        .insert(AuthenticatedPlayer { id: claims.sub });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn forge_token(secret: &str, sub: Uuid, exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": sub, "exp": exp }).to_string());
        let message = format!("{header}.{payload}");
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(message.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{message}.{signature}")
    }

    #[test]
    fn valid_token_yields_claims() {
        let sub = Uuid::new_v4();
        let token = forge_token(SECRET, sub, Utc::now().timestamp() + 3600);

        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, sub);
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = forge_token(SECRET, Uuid::new_v4(), Utc::now().timestamp() - 60);

        assert!(matches!(
            verify_token(&token, SECRET),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = forge_token("other-secret", Uuid::new_v4(), Utc::now().timestamp() + 3600);

        assert!(matches!(
            verify_token(&token, SECRET),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = forge_token(SECRET, Uuid::new_v4(), Utc::now().timestamp() + 3600);
        let forged_payload =
            URL_SAFE_NO_PAD.encode(json!({ "sub": Uuid::new_v4(), "exp": i64::MAX }).to_string());
        let parts: Vec<&str> = token.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(matches!(
            verify_token(&tampered, SECRET),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            verify_token("not-a-jwt", SECRET),
            Err(AuthError::Malformed)
        ));
    }
}
