use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{config::Config, db::UserRepo, error::AppResult, model::User, AppState};

pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    pub sub: i64,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}

/// The logged-in user, attached to the request by [`identify`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub fn issue_token(user: &User, config: &Config) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + chrono::Duration::days(config.jwt_maxage_days)).timestamp() as usize;
    let claims = TokenClaims {
        sub: user.id,
        username: user.username.to_owned(),
        iat,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
}

pub fn verify_token(token: &str, config: &Config) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

pub fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, token)
        .path("/")
        .max_age(time::Duration::days(config.jwt_maxage_days))
        .same_site(SameSite::Lax)
        .http_only(true)
        .finish()
}

pub fn expired_cookie() -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, "")
        .path("/")
        .max_age(time::Duration::hours(-1))
        .same_site(SameSite::Lax)
        .http_only(true)
        .finish()
}

/// Resolve the session token, if any, to a user and store it as a
/// [`CurrentUser`] request extension.
///
/// Never rejects: anonymous requests go through untouched and handlers
/// decide what an anonymous visitor may do. The token is read from the
/// `token` cookie, falling back to an `Authorization: Bearer` header.
pub async fn identify<B>(
    State(data): State<Arc<AppState>>,
    cookie_jar: CookieJar,
    mut req: Request<B>,
    next: Next<B>,
) -> AppResult<Response> {
    let token = cookie_jar
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_owned)
        })
        .filter(|token| !token.is_empty());

    if let Some(token) = token {
        match verify_token(&token, &data.config) {
            Ok(claims) => {
                if let Some(user) = UserRepo::find_by_id(&data.db, claims.sub).await? {
                    req.extensions_mut().insert(CurrentUser(user));
                } else {
                    tracing::debug!(user_id = claims.sub, "token refers to a missing user");
                }
            }
            Err(err) => tracing::debug!(error = %err, "ignoring invalid session token"),
        }
    }

    Ok(next.run(req).await)
}
