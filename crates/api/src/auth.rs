//! Authentication middleware
//!
//! Validates Supabase-issued JWTs locally with the shared HS256 secret and
//! attaches an `AuthUser` extension to the request. The users table is
//! provisioned lazily on first authenticated request, keyed by the token's
//! subject id.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use coursebundle_shared::User;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Claims we care about from the Supabase access token
#[derive(Debug, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    pub aud: String,
    pub exp: usize,
}

/// Authenticated caller, attached as a request extension by `require_auth`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

fn extract_bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(String::from)
}

/// Decode and validate a Supabase access token
fn decode_claims(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&["authenticated"]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(jwt_error = %e, "JWT validation failed");
        ApiError::Unauthorized
    })
}

/// Middleware requiring a valid bearer token on the request
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&request).ok_or(ApiError::Unauthorized)?;
    let claims = decode_claims(&token, &state.config.supabase_jwt_secret)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::Unauthorized)?;

    if let Some(email) = &claims.email {
        provision_user(&state.pool, user_id, email).await?;
    }

    request.extensions_mut().insert(AuthUser {
        user_id,
        email: claims.email,
    });

    Ok(next.run(request).await)
}

/// Create the local user row on first sight of this subject id
async fn provision_user(pool: &PgPool, user_id: Uuid, email: &str) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email)
        VALUES ($1, $2)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(email)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load the full user row for the authenticated caller
pub async fn current_user(pool: &PgPool, auth: &AuthUser) -> ApiResult<User> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_optional(pool)
        .await?;

    user.ok_or_else(|| ApiError::NotFound("user not found".into()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    const SECRET: &str = "test-jwt-secret";

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        email: Option<String>,
        aud: String,
        exp: usize,
    }

    fn make_token(sub: &str, aud: &str, exp_offset_secs: i64) -> String {
        let exp = (time::OffsetDateTime::now_utc().unix_timestamp() + exp_offset_secs) as usize;
        let claims = TestClaims {
            sub: sub.to_string(),
            email: Some("user@example.com".to_string()),
            aud: aud.to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_decodes() {
        let sub = "6f2f9ffb-9f05-4e74-8c3e-2f37ad0f0d10";
        let token = make_token(sub, "authenticated", 3600);
        let claims = decode_claims(&token, SECRET).unwrap();
        assert_eq!(claims.sub, sub);
        assert_eq!(claims.email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = make_token("abc", "authenticated", -3600);
        assert!(decode_claims(&token, SECRET).is_err());
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let token = make_token("abc", "anon", 3600);
        assert!(decode_claims(&token, SECRET).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = make_token("abc", "authenticated", 3600);
        assert!(decode_claims(&token, "other-secret").is_err());
    }
}
