use crate::models::user::{Claims, User};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token ttl is out of range")]
    InvalidTtl,

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("invalid token")]
    InvalidToken,
}

/// Issues and verifies HS256 identity tokens.
///
/// Secret and TTL are fixed when the service is built. Verification is pure:
/// no store, no revocation list. A token is good until `exp`, then it's dead,
/// and there is no leeway either way.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDelta,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, TokenError> {
        let ttl = TimeDelta::from_std(ttl).map_err(|_| TokenError::InvalidTtl)?;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    /// Signs `{uid, email, exp = now + ttl}` for the given user.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let exp = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or(TokenError::InvalidTtl)?
            .timestamp();

        let claims = Claims {
            uid: user.id,
            email: user.email.clone(),
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Checks the signature and expiry and hands back the claims.
    ///
    /// Every failure collapses into `InvalidToken`. Callers don't get to know
    /// whether it was a bad signature, a bad shape, or just old.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| TokenError::InvalidToken)?
            .claims;

        // The library accepts exp == now. We don't.
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::InvalidToken);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "Darm";

    fn user() -> User {
        User {
            id: 7,
            email: "a@x.com".to_string(),
            password_hash: String::new(),
        }
    }

    fn service() -> TokenService {
        TokenService::new(SECRET, Duration::from_secs(12 * 3600)).unwrap()
    }

    #[test]
    fn issued_token_verifies_with_the_same_claims() {
        let svc = service();
        let before = Utc::now().timestamp();
        let token = svc.issue(&user()).unwrap();

        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.uid, 7);
        assert_eq!(claims.email, "a@x.com");

        let expected = before + 12 * 3600;
        assert!((claims.exp - expected).abs() <= 1, "exp {} vs {}", claims.exp, expected);
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let other = TokenService::new("not-darm", Duration::from_secs(60)).unwrap();
        let token = other.issue(&user()).unwrap();

        assert!(matches!(service().verify(&token), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let svc = service();
        let token = svc.issue(&user()).unwrap();

        // Swap in the payload of a token for a different user, keep the original signature.
        let forged_user = User { id: 1, ..user() };
        let forged = svc.issue(&forged_user).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert!(matches!(svc.verify(&spliced), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            uid: 7,
            email: "a@x.com".to_string(),
            exp: Utc::now().timestamp() - 5,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(service().verify(&token), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(service().verify("not.a.jwt"), Err(TokenError::InvalidToken)));
        assert!(matches!(service().verify(""), Err(TokenError::InvalidToken)));
    }
}
