//! API key authentication for the protected routes

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::env;

#[derive(Debug)]
pub enum AuthError {
    MissingApiKey,
    InvalidApiKey,
    NotConfigured,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingApiKey => (StatusCode::UNAUTHORIZED, "Missing X-API-Key header"),
            AuthError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "Invalid API key"),
            AuthError::NotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "API keys not configured. Set VOICEFIT_API_KEYS environment variable.",
            ),
        };
        (status, message).into_response()
    }
}

/// Constant-time string comparison to prevent timing attacks
///
/// Note: This leaks the length of the shorter string, but that's acceptable
/// for API keys where lengths are not secret.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let mut result = (a.len() ^ b.len()) as u8;

    let min_len = std::cmp::min(a.len(), b.len());
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    for i in 0..min_len {
        result |= a_bytes[i] ^ b_bytes[i];
    }

    result == 0
}

/// Validate against VOICEFIT_API_KEYS (comma-separated)
pub fn validate_api_key(provided_key: &str) -> Result<(), AuthError> {
    let valid_keys = match env::var("VOICEFIT_API_KEYS") {
        Ok(keys) if !keys.trim().is_empty() => keys,
        _ => {
            let is_production = env::var("VOICEFIT_ENV")
                .map(|v| v.to_lowercase() == "production" || v.to_lowercase() == "prod")
                .unwrap_or(false);

            if is_production {
                tracing::error!("VOICEFIT_API_KEYS not set in production mode");
                return Err(AuthError::NotConfigured);
            }

            tracing::warn!(
                "VOICEFIT_API_KEYS not set - using development key (not for production!)"
            );
            "voicefit-dev-key-change-in-production".to_string()
        }
    };

    let keys: Vec<&str> = valid_keys.split(',').map(|k| k.trim()).collect();

    // Check every key so timing does not reveal which one matched
    let mut found = false;
    for key in &keys {
        if constant_time_compare(key, provided_key) {
            found = true;
        }
    }

    if found {
        Ok(())
    } else {
        Err(AuthError::InvalidApiKey)
    }
}

/// Authentication middleware for protected routes
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let api_key_value = match request
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
    {
        Some(key) => key,
        None => return AuthError::MissingApiKey.into_response(),
    };

    if let Err(e) = validate_api_key(&api_key_value) {
        return e.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_validate_api_key() {
        env::set_var("VOICEFIT_API_KEYS", "key1,key2");
        assert!(validate_api_key("key1").is_ok());
        assert!(validate_api_key("key2").is_ok());
        assert!(validate_api_key("invalid").is_err());
        env::remove_var("VOICEFIT_API_KEYS");
    }
}
