//! PKCE (RFC 7636), S256 method only.
//!
//! The "plain" method is rejected. Challenges arrive on the
//! authorization request and are verified against the `code_verifier`
//! presented at the token endpoint.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::AuthResult;
use crate::error::AuthError;

/// Validates a `code_challenge_method` parameter.
///
/// # Errors
///
/// Returns `invalid_request` for any method other than `S256`.
pub fn validate_method(method: &str) -> AuthResult<()> {
    if method == "S256" {
        Ok(())
    } else {
        Err(AuthError::invalid_request(format!(
            "Unsupported code_challenge_method: {method}. Only S256 is supported"
        )))
    }
}

/// Validates a `code_verifier` per RFC 7636 section 4.1.
///
/// # Errors
///
/// Returns `invalid_request` when the length is outside 43..=128 or a
/// character falls outside the unreserved set `[A-Za-z0-9-._~]`.
pub fn validate_verifier(verifier: &str) -> AuthResult<()> {
    if !(43..=128).contains(&verifier.len()) {
        return Err(AuthError::invalid_request(
            "code_verifier must be 43-128 characters",
        ));
    }
    if !verifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '~')
    {
        return Err(AuthError::invalid_request(
            "code_verifier contains invalid characters",
        ));
    }
    Ok(())
}

/// Computes the S256 challenge for a verifier:
/// `BASE64URL(SHA256(ASCII(code_verifier)))`.
#[must_use]
pub fn challenge_for(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Verifies a presented `code_verifier` against the stored challenge.
///
/// The comparison is constant-time over the encoded digests.
///
/// # Errors
///
/// Returns `invalid_request` on a malformed verifier and a PKCE
/// verification error (mapped to `invalid_grant`) on a mismatch.
pub fn verify(stored_challenge: &str, verifier: &str) -> AuthResult<()> {
    validate_verifier(verifier)?;

    let expected = challenge_for(verifier);
    let matches: bool = expected
        .as_bytes()
        .ct_eq(stored_challenge.as_bytes())
        .into();
    if matches {
        Ok(())
    } else {
        Err(AuthError::PkceVerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7636 Appendix B test vector
    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        assert_eq!(challenge_for(VERIFIER), CHALLENGE);
        verify(CHALLENGE, VERIFIER).unwrap();
    }

    #[test]
    fn test_mismatch_is_invalid_grant() {
        let err = verify(CHALLENGE, &"a".repeat(43)).unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_grant");
    }

    #[test]
    fn test_verifier_length_bounds() {
        assert!(validate_verifier(&"a".repeat(42)).is_err());
        assert!(validate_verifier(&"a".repeat(43)).is_ok());
        assert!(validate_verifier(&"a".repeat(128)).is_ok());
        assert!(validate_verifier(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_verifier_charset() {
        assert!(validate_verifier(&format!("{}-._~", "a".repeat(43))).is_ok());
        assert!(validate_verifier(&format!("{}!", "a".repeat(43))).is_err());
    }

    #[test]
    fn test_plain_method_rejected() {
        validate_method("S256").unwrap();
        assert!(validate_method("plain").is_err());
        assert!(validate_method("s256").is_err());
    }

    #[test]
    fn test_malformed_verifier_is_invalid_request() {
        let err = verify(CHALLENGE, "short").unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_request");
    }
}
