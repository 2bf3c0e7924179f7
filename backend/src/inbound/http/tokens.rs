//! Bearer token verification endpoint.
//!
//! Verification failures are not answered here: they are tagged as token
//! failures and left to the error pipeline, which hides the library detail
//! behind fixed messages in production.

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{Failure, OperationalError};

/// Message returned when a request carries no bearer token.
pub const MISSING_TOKEN_MESSAGE: &str = "You are not logged in! Please log in to get access.";

/// Claims the verifier expects in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject the token was issued to.
    pub sub: String,
    /// Expiry as seconds since the Unix epoch.
    pub exp: u64,
}

/// HS256 verifier shared across workers.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Build a verifier for tokens signed with `secret`.
    #[must_use]
    pub fn hs256(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify `token` and return its claims.
    ///
    /// # Errors
    /// Returns an expired-token failure for tokens past their expiry and an
    /// invalid-token failure for every other verification error.
    pub fn verify(&self, token: &str) -> Result<Claims, Failure> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verify the request's bearer token and echo its subject.
///
/// # Errors
/// Fails with a 401 when no bearer token is present, or with a token failure
/// when verification does not succeed.
pub async fn verify_token(
    verifier: web::Data<TokenVerifier>,
    req: HttpRequest,
) -> Result<HttpResponse, Failure> {
    let token =
        bearer_token(&req).ok_or_else(|| OperationalError::unauthorized(MISSING_TOKEN_MESSAGE))?;
    let claims = verifier.verify(token)?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "subject": claims.sub },
    })))
}

#[cfg(test)]
mod tests {
    //! Tests for bearer token extraction and verification.

    use super::*;
    use crate::domain::FailureKind;
    use actix_web::test::TestRequest;
    use jsonwebtoken::{EncodingKey, Header, encode, get_current_timestamp};
    use rstest::{fixture, rstest};

    const SECRET: &[u8] = b"my-ultra-secure-and-ultra-long-secret";

    #[fixture]
    fn verifier() -> TokenVerifier {
        TokenVerifier::hs256(SECRET)
    }

    fn token_expiring_at(exp: u64, secret: &[u8]) -> String {
        let claims = Claims {
            sub: "5c8a1d5b0190b214360dc031".to_owned(),
            exp,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
            .expect("token encodes")
    }

    #[rstest]
    fn accepts_a_fresh_token(verifier: TokenVerifier) {
        let token = token_expiring_at(get_current_timestamp() + 3_600, SECRET);
        let claims = verifier.verify(&token).expect("token verifies");
        assert_eq!(claims.sub, "5c8a1d5b0190b214360dc031");
    }

    #[rstest]
    fn expired_tokens_are_tagged_as_expired(verifier: TokenVerifier) {
        let token = token_expiring_at(get_current_timestamp() - 3_600, SECRET);
        let failure = verifier.verify(&token).expect_err("token has expired");
        assert!(matches!(failure.kind(), FailureKind::ExpiredToken { .. }));
    }

    #[rstest]
    #[case::wrong_secret(token_expiring_at(get_current_timestamp() + 3_600, b"another-secret"))]
    #[case::garbage("not.a.jwt".to_owned())]
    fn bad_tokens_are_tagged_as_invalid(verifier: TokenVerifier, #[case] token: String) {
        let failure = verifier.verify(&token).expect_err("token is invalid");
        assert!(matches!(failure.kind(), FailureKind::InvalidToken { .. }));
    }

    #[rstest]
    #[case(Some("Bearer abc.def.ghi"), Some("abc.def.ghi"))]
    #[case(Some("Bearer   "), None)]
    #[case(Some("Basic dXNlcjpwYXNz"), None)]
    #[case(None, None)]
    fn extracts_bearer_tokens(#[case] authorization: Option<&str>, #[case] expected: Option<&str>) {
        let mut req = TestRequest::get();
        if let Some(value) = authorization {
            req = req.insert_header((header::AUTHORIZATION, value));
        }
        let req = req.to_http_request();
        assert_eq!(bearer_token(&req), expected);
    }

    #[rstest]
    #[actix_web::test]
    async fn missing_tokens_are_rejected_with_401(verifier: TokenVerifier) {
        let req = TestRequest::post().to_http_request();
        let failure = verify_token(web::Data::new(verifier), req)
            .await
            .expect_err("no token supplied");
        assert_eq!(failure.status_code(), 401);
        assert_eq!(failure.message(), MISSING_TOKEN_MESSAGE);
    }
}
