use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::error_handling::{AppError, Result};
use crate::middleware::metrics::record_auth_failure;
use crate::AppState;

/// Platform role carried in the token. Role checks belong to the
/// authorization layer in front of this service; the inquiry engine only
/// needs the caller's organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Operator,
    Admin,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    /// Every inquiry endpoint acts on behalf of the caller's organization
    pub fn require_organization(&self) -> Result<Uuid> {
        self.organization_id.ok_or_else(|| {
            AppError::Forbidden("No organization associated with this account".to_string())
        })
    }
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
        }
    }

    /// Tokens are normally minted by the platform's identity service; this
    /// is used by tooling and tests that need a valid bearer token.
    pub fn generate_token(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        role: UserRole,
        ttl_secs: usize,
    ) -> std::result::Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp().max(0) as usize;

        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            organization_id,
            role,
            exp: now + ttl_secs,
            iat: now,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    pub fn validate_token(&self, token: &str) -> std::result::Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
    }

    pub fn extract_token_from_header(auth_header: &str) -> Option<&str> {
        auth_header.strip_prefix("Bearer ")
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, StatusCode> {
    let jwt_service = JwtService::new(&state.config.jwt_secret);

    // Cookie first, Authorization header as fallback
    let cookie_jar = CookieJar::from_headers(request.headers());
    let token = if let Some(cookie) = cookie_jar.get("auth_token") {
        Some(cookie.value().to_string())
    } else {
        request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(JwtService::extract_token_from_header)
            .map(str::to_string)
    };

    let Some(token) = token else {
        record_auth_failure("missing_token");
        return Err(StatusCode::UNAUTHORIZED);
    };

    match jwt_service.validate_token(&token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(e) => {
            tracing::debug!("Rejected token: {}", e);
            record_auth_failure("invalid_token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-for-inquiry-service";

    #[test]
    fn test_token_round_trip() {
        let service = JwtService::new(SECRET);
        let user_id = Uuid::new_v4();
        let org_id = Uuid::new_v4();

        let token = service
            .generate_token(user_id, Some(org_id), UserRole::Customer, 3600)
            .unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.require_organization().unwrap(), org_id);
        assert_eq!(claims.role, UserRole::Customer);
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let token = JwtService::new("another-secret")
            .generate_token(Uuid::new_v4(), None, UserRole::Admin, 3600)
            .unwrap();
        assert!(JwtService::new(SECRET).validate_token(&token).is_err());
    }

    #[test]
    fn test_claims_without_organization_forbidden() {
        let token = JwtService::new(SECRET)
            .generate_token(Uuid::new_v4(), None, UserRole::Operator, 3600)
            .unwrap();
        let claims = JwtService::new(SECRET).validate_token(&token).unwrap();
        assert!(matches!(claims.require_organization(), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(JwtService::extract_token_from_header("Bearer abc.def"), Some("abc.def"));
        assert_eq!(JwtService::extract_token_from_header("Basic abc"), None);
    }
}
