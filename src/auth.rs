use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Opaque identity attached to every authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("missing JWT_SECRET")]
    MissingSecret,
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn authenticate(headers: &HeaderMap, secret: Option<&str>) -> Result<AuthUser, AuthError> {
    let secret = secret.ok_or(AuthError::MissingSecret)?;
    let token = extract_token(headers).ok_or(AuthError::MissingToken)?;
    verify_jwt_hs256(&token, secret)
}

/// Identity is the `email` claim (trimmed, lowercased) or else the `id` claim.
fn identity_from_claims(payload: &serde_json::Value) -> Option<String> {
    let email = payload
        .get("email")
        .and_then(|value| value.as_str())
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty());
    if email.is_some() {
        return email;
    }

    match payload.get("id") {
        Some(serde_json::Value::String(id)) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Some(serde_json::Value::Number(id)) => Some(id.to_string()),
        _ => None,
    }
}

pub fn verify_jwt_hs256(token: &str, secret: &str) -> Result<AuthUser, AuthError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    let payload_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    let sig_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    if parts.next().is_some() {
        return Err(AuthError::InvalidToken);
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    let sig_bytes = URL_SAFE_NO_PAD
        .decode(sig_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;

    let header_json: serde_json::Value =
        serde_json::from_slice(&header_bytes).map_err(|_| AuthError::InvalidToken)?;
    let alg = header_json
        .get("alg")
        .and_then(|value| value.as_str())
        .ok_or(AuthError::InvalidToken)?;
    if alg != "HS256" {
        return Err(AuthError::InvalidToken);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)?;
    mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
    mac.verify_slice(&sig_bytes)
        .map_err(|_| AuthError::InvalidToken)?;

    let payload_json: serde_json::Value =
        serde_json::from_slice(&payload_bytes).map_err(|_| AuthError::InvalidToken)?;

    validate_registered_claims(&payload_json)?;

    let user_id = identity_from_claims(&payload_json).ok_or(AuthError::InvalidToken)?;
    Ok(AuthUser { user_id })
}

fn validate_registered_claims(payload: &serde_json::Value) -> Result<(), AuthError> {
    let now = Utc::now().timestamp();

    if let Some(exp) = payload.get("exp").and_then(|value| value.as_i64()) {
        if now >= exp {
            return Err(AuthError::InvalidToken);
        }
    }

    if let Some(nbf) = payload.get("nbf").and_then(|value| value.as_i64()) {
        if now < nbf {
            return Err(AuthError::InvalidToken);
        }
    }

    Ok(())
}

/// Signs an HS256 token over the given claims. Used by tooling and tests.
pub fn sign_jwt(claims: &serde_json::Value, secret: &str) -> Result<String, AuthError> {
    let header_json = serde_json::json!({
        "alg": "HS256",
        "typ": "JWT",
    });

    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header_json).map_err(|_| AuthError::InvalidToken)?);
    let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).map_err(|_| AuthError::InvalidToken)?);
    let signing_input = format!("{header_b64}.{payload_b64}");

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();
    let sig_b64 = URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{signing_input}.{sig_b64}"))
}
