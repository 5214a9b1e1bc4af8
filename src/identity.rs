//! Publisher identity derived from the repository token.
//!
//! The DataONE token is a JWT whose `userId` claim names the subject that
//! becomes rights holder, creator and contact of the package. The token is
//! only decoded here; the member node verifies its signature on every call.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

use crate::error::AuthError;

const ORCID_DIRECTORY: &str = "https://orcid.org";
const CILOGON_DIRECTORY: &str = "https://cilogon.org";

/// Extracts the `userId` claim from a JWT. ORCID ids are returned as https URLs.
pub fn extract_user_id(token: &str) -> Result<String, AuthError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::InvalidCredentials("token is not a JWT".to_string()))?;

    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::InvalidCredentials(format!("undecodable token payload: {}", e)))?;
    let claims: Value = serde_json::from_slice(&decoded)
        .map_err(|e| AuthError::InvalidCredentials(format!("malformed token claims: {}", e)))?;

    let user_id = claims
        .get("userId")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AuthError::InvalidCredentials("token has no userId claim".to_string()))?;

    if is_orcid_id(user_id) {
        Ok(make_url_https(user_id))
    } else {
        Ok(user_id.to_string())
    }
}

pub fn is_orcid_id(user_id: &str) -> bool {
    user_id.contains("orcid.org")
}

/// Identity directory that issued `user_id`.
pub fn directory_for(user_id: &str) -> &'static str {
    if is_orcid_id(user_id) {
        ORCID_DIRECTORY
    } else {
        CILOGON_DIRECTORY
    }
}

/// Rewrites an http URL to https; anything unparsable is returned unchanged.
pub fn make_url_https(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.set_scheme("https").is_ok() {
                parsed.to_string()
            } else {
                raw.to_string()
            }
        }
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(claims: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#),
            URL_SAFE_NO_PAD.encode(claims)
        )
    }

    #[test]
    fn test_extract_orcid_user_id() {
        let token = token_with(r#"{"userId": "http://orcid.org/0000-0002-1756-2128"}"#);
        assert_eq!(
            extract_user_id(&token).expect("user id"),
            "https://orcid.org/0000-0002-1756-2128"
        );
    }

    #[test]
    fn test_extract_plain_user_id() {
        let token = token_with(r#"{"userId": "CN=Jane Doe A123,O=Google,C=US,DC=cilogon,DC=org"}"#);
        assert_eq!(
            extract_user_id(&token).expect("user id"),
            "CN=Jane Doe A123,O=Google,C=US,DC=cilogon,DC=org"
        );
    }

    #[test]
    fn test_missing_claim_is_rejected() {
        let token = token_with(r#"{"sub": "someone"}"#);
        assert!(matches!(
            extract_user_id(&token),
            Err(AuthError::InvalidCredentials(_))
        ));
        assert!(extract_user_id("not-a-jwt").is_err());
    }

    #[test]
    fn test_directory() {
        assert_eq!(directory_for("https://orcid.org/0000-0001"), "https://orcid.org");
        assert_eq!(directory_for("CN=someone"), "https://cilogon.org");
    }
}
