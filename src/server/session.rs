use super::state::ServerState;
use crate::user::auth::AuthTokenValue;
use crate::user::{Permission, UserRole};

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

pub const SESSION_TOKEN_COOKIE: &str = "session_token";
pub const SESSION_TOKEN_HEADER: &str = "Authorization";

/// An authenticated caller: the user behind the token and the permissions
/// resolved from their roles at extraction time.
#[derive(Debug)]
pub struct Session {
    pub user_id: usize,
    pub token: String,
    pub permissions: Vec<Permission>,
}

impl Session {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

pub enum SessionExtractionError {
    AccessDenied,
    InternalError,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::AccessDenied => StatusCode::UNAUTHORIZED.into_response(),
            SessionExtractionError::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Builds a synthetic session from the dev role header. Only consulted when
/// the header is enabled in config; an unrecognized role value yields no
/// session rather than falling back to token auth.
fn dev_role_session(parts: &Parts, header_name: &str) -> Option<Session> {
    let role_name = parts.headers.get(header_name)?.to_str().ok()?;
    match UserRole::from_str(role_name) {
        Some(role) => {
            debug!("Dev role header grants role {}", role.as_str());
            Some(Session {
                user_id: 0,
                token: String::new(),
                permissions: role.permissions().to_vec(),
            })
        }
        None => {
            debug!("Dev role header carries unknown role {}", role_name);
            None
        }
    }
}

/// The token the caller presented, taken from the session cookie or, failing
/// that, the raw Authorization header.
async fn presented_token(parts: &mut Parts, ctx: &ServerState) -> Option<AuthTokenValue> {
    let jar = CookieJar::from_request_parts(parts, ctx)
        .await
        .expect("Could not read cookies into CookieJar.");
    if let Some(cookie) = jar.get(SESSION_TOKEN_COOKIE) {
        return Some(AuthTokenValue(cookie.value().to_string()));
    }

    let header = parts.headers.get(SESSION_TOKEN_HEADER)?;
    Some(AuthTokenValue(
        String::from_utf8_lossy(header.as_bytes()).into_owned(),
    ))
}

fn session_for_token(token: AuthTokenValue, ctx: &ServerState) -> Option<Session> {
    let user_manager = ctx.user_manager.lock().unwrap();

    let auth_token = match user_manager.get_auth_token(&token) {
        Ok(Some(found)) => found,
        Ok(None) => {
            debug!("Auth token not found in database");
            return None;
        }
        Err(e) => {
            debug!("Failed to get auth token from database: {}", e);
            return None;
        }
    };
    debug!("Found auth token for user_id={}", auth_token.user_id);

    // A failed timestamp refresh does not invalidate the session.
    if let Err(e) = user_manager.update_auth_token_last_used(&token) {
        debug!("Failed to update auth token last_used timestamp: {}", e);
    }

    let permissions = match user_manager.get_user_permissions(auth_token.user_id) {
        Ok(perms) => perms,
        Err(e) => {
            debug!(
                "Failed to resolve permissions for user_id={}: {}",
                auth_token.user_id, e
            );
            return None;
        }
    };
    debug!(
        "Resolved permissions for user_id={}: {:?}",
        auth_token.user_id, permissions
    );

    Some(Session {
        user_id: auth_token.user_id,
        token: auth_token.value.0,
        permissions,
    })
}

async fn extract_session(parts: &mut Parts, ctx: &ServerState) -> Option<Session> {
    if let Some(header_name) = &ctx.config.dev_role_header {
        if parts.headers.contains_key(header_name.as_str()) {
            return dev_role_session(parts, header_name);
        }
    }

    let token = match presented_token(parts, ctx).await {
        Some(token) => token,
        None => {
            debug!("No token in cookies nor headers.");
            return None;
        }
    };

    session_for_token(token, ctx)
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session(parts, ctx)
            .await
            .ok_or(SessionExtractionError::AccessDenied)
    }
}

impl FromRequestParts<ServerState> for Option<Session> {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        Ok(extract_session(parts, ctx).await)
    }
}
