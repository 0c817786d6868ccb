//! Session transport: the opaque token cookie and the `SignedIn` extractor
//! that turns it back into a session context.

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::warn;

use timetabler_core::domain::session::{SessionContext, SessionToken};

use crate::portal::{PortalFailure, PortalState};

/// Value of cookie `name` across every `Cookie` header on the request.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Clone, Debug)]
pub struct CookieSettings {
    pub name: String,
    pub max_age_secs: i64,
    pub secure: bool,
}

impl CookieSettings {
    pub fn issue(&self, token: &SessionToken) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.name, token.0, self.max_age_secs
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear(&self) -> String {
        format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", self.name)
    }
}

/// An authenticated request. Missing, unknown or expired sessions are
/// answered with a redirect to the sign-in page.
#[derive(Clone, Debug)]
pub struct SignedIn(pub SessionContext);

impl FromRequestParts<PortalState> for SignedIn {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &PortalState,
    ) -> Result<Self, Self::Rejection> {
        resolve_session(&parts.headers, state)
            .await
            .map(SignedIn)
            .map_err(IntoResponse::into_response)
    }
}

async fn resolve_session(
    headers: &HeaderMap,
    state: &PortalState,
) -> Result<SessionContext, PortalFailure> {
    let token = read_cookie(headers, &state.cookies().name)
        .map(SessionToken)
        .ok_or(PortalFailure::SignInRequired)?;

    let record = state.sessions().find(&token).await?.ok_or(PortalFailure::SignInRequired)?;
    if record.is_expired(Utc::now()) {
        state.sessions().delete(&token).await?;
        return Err(PortalFailure::SignInRequired);
    }

    let user =
        state.users().find_by_id(record.user_id).await?.ok_or(PortalFailure::SignInRequired)?;
    let identity = match user.identity() {
        Ok(identity) => identity,
        Err(error) => {
            warn!(
                event_name = "portal.session.rejected",
                user_id = %record.user_id,
                error = %error,
                "session owner no longer resolves to a known role"
            );
            state.sessions().delete(&token).await?;
            return Err(PortalFailure::SignInRequired);
        }
    };

    Ok(SessionContext { token: record.token, identity, expires_at: record.expires_at })
}
