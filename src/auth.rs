use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;
use sha2::{Digest, Sha256};

use crate::backend::AuthSession;
use crate::context::AppContext;
use crate::error::AuthError;

pub const SESSION_COOKIE: &str = "folio_session";

// ── Client IP request guard ──

/// Real client IP. Proxy headers are checked first:
///   1. X-Real-IP (nginx proxy_set_header)
///   2. X-Forwarded-For (first IP in the chain)
///   3. Rocket's client_ip() (socket peer address)
pub struct ClientIp(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = request.headers();

        if let Some(ip) = headers.get_one("X-Real-IP") {
            let ip = ip.trim();
            if !ip.is_empty() {
                return Outcome::Success(ClientIp(ip.to_string()));
            }
        }

        if let Some(forwarded) = headers.get_one("X-Forwarded-For") {
            if let Some(ip) = forwarded.split(',').next() {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return Outcome::Success(ClientIp(ip.to_string()));
                }
            }
        }

        let ip = request
            .client_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Outcome::Success(ClientIp(ip))
    }
}

// ── Admin guard ──

/// A request carrying a live backend session. Failing requests are
/// forwarded with 401 so the login fallback routes can pick them up.
pub struct AdminUser {
    pub session: AuthSession,
}

impl AdminUser {
    pub fn token(&self) -> &str {
        &self.session.access_token
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_session(request).await {
            Some(session) => Outcome::Success(AdminUser { session }),
            None => Outcome::Forward(Status::Unauthorized),
        }
    }
}

async fn resolve_session(request: &Request<'_>) -> Option<AuthSession> {
    let ctx = request.guard::<&State<AppContext>>().await.succeeded()?;
    let cookies = request.cookies();
    let token = cookies.get_private(SESSION_COOKIE)?.value().to_string();

    match ctx.backend().get_session(&token).await {
        Ok(Some(session)) => Some(session),
        Ok(None) => {
            cookies.remove_private(Cookie::from(SESSION_COOKIE));
            None
        }
        Err(e) => {
            log::error!("Session check failed: {}", e);
            None
        }
    }
}

// ── Login / logout ──

/// Sign in against the backend and store the access token in the session
/// cookie.
pub async fn login(
    ctx: &AppContext,
    cookies: &CookieJar<'_>,
    email: &str,
    password: &str,
) -> Result<AuthSession, AuthError> {
    let session = ctx.backend().sign_in(email.trim(), password).await?;
    set_session_cookie(cookies, &session.access_token);
    Ok(session)
}

/// Sign out on the backend. The cookie is cleared whatever the backend says.
pub async fn logout(ctx: &AppContext, cookies: &CookieJar<'_>) -> Result<(), AuthError> {
    let token = cookies
        .get_private(SESSION_COOKIE)
        .map(|c| c.value().to_string());
    clear_session_cookie(cookies);
    match token {
        Some(token) => ctx.backend().sign_out(&token).await,
        None => Ok(()),
    }
}

pub fn set_session_cookie(cookies: &CookieJar<'_>, token: &str) {
    let mut cookie = Cookie::new(SESSION_COOKIE, token.to_string());
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_path("/");
    cookies.add_private(cookie);
}

pub fn clear_session_cookie(cookies: &CookieJar<'_>) {
    cookies.remove_private(Cookie::from(SESSION_COOKIE));
}

/// SHA-256 hex digest; keys the login throttle and the navigator so raw IPs
/// and tokens are never held in memory maps.
pub fn hash_key(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}
