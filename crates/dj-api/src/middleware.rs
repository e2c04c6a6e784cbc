//! digital-journal/crates/dj-api/src/middleware.rs Middleware
//!
//! Request logging and response hardening shared by every route.

use actix_session::config::{CookieContentSecurity, PersistentSession};
use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::time::Duration;
use actix_web::cookie::{Key, SameSite};
use actix_web::middleware::{DefaultHeaders, Logger};

pub const SESSION_COOKIE: &str = "dj_session";

/// Access log in the default format:
/// remote-ip "request-line" status-code response-size "referrer" "user-agent".
/// Records go through the `log` facade into the tracing subscriber.
pub fn standard_middleware() -> Logger {
    Logger::default()
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
        .add(("Content-Security-Policy", "default-src 'self'; img-src 'self' data:"))
}

/// Encrypted cookie session. `cookie_secure` should only be off for plain-HTTP development.
pub fn session_middleware(key: Key, cookie_secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(SESSION_COOKIE.into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(SameSite::Lax)
        .session_lifecycle(PersistentSession::default().session_ttl(Duration::weeks(2)))
        .build()
}
