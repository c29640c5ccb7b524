//! Browser-facing sign-in, callback and sign-out endpoints.
//!
//! Every response here is a `302 Found`.

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use uuid::Uuid;

use crate::services::federation::{AUTH_FAILURE_PATH, HOME_PATH};
use crate::AppState;

pub const SESSION_COOKIE: &str = "sid";

#[derive(Debug, Default, Deserialize)]
pub struct SignInQuery {
    pub provider: Option<String>,
    #[serde(rename = "redirectOnSuccess")]
    pub redirect_on_success: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    #[serde(rename = "redirectOnSuccess")]
    pub redirect_on_success: Option<String>,
}

/// `302 Found` to `location`, or to the failure notice if `location` is not
/// a valid header value.
pub fn found(location: &str) -> Response {
    let location = HeaderValue::from_str(location).unwrap_or_else(|_| {
        tracing::warn!("Redirect target is not a valid Location header, using failure notice");
        HeaderValue::from_static(AUTH_FAILURE_PATH)
    });
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn session_cookie(session_id: Uuid, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .build()
}

#[tracing::instrument(skip_all, fields(provider = ?query.as_ref().and_then(|q| q.provider.as_deref())))]
pub async fn sign_in(
    State(state): State<AppState>,
    query: Option<Query<SignInQuery>>,
) -> Response {
    let Query(query) = query.unwrap_or_default();
    let location = state.federation.sign_in_location(
        query.provider.as_deref(),
        query.redirect_on_success.as_deref(),
    );
    found(&location)
}

#[tracing::instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    query: Option<Query<CallbackQuery>>,
) -> Response {
    let Query(query) = query.unwrap_or_default();
    let completion = state
        .federation
        .callback(query.code.as_deref(), query.redirect_on_success.as_deref())
        .await;

    match completion.session {
        Some(session) => {
            let jar = jar.add(session_cookie(session.id, state.config.secure_cookies()));
            (jar, found(&completion.location)).into_response()
        }
        None => found(&completion.location),
    }
}

#[tracing::instrument(skip_all)]
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> Response {
    let session_id = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok());

    if let Some(session_id) = session_id {
        if let Err(e) = state.federation.sign_out(session_id).await {
            tracing::error!(session_id = %session_id, error = %e, "Sign-out failed");
        }
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, found(HOME_PATH)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_uses_302_and_location() {
        let response = found("/sign-up/complete");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/sign-up/complete");
    }

    #[test]
    fn invalid_location_falls_back_to_failure_notice() {
        let response = found("/bad\nheader");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], AUTH_FAILURE_PATH);
    }

    #[test]
    fn session_cookie_is_http_only_and_lax() {
        let cookie = session_cookie(Uuid::nil(), true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
