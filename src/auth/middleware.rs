//! Bearer-token authentication extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{instrument, trace};

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    errors::{Error, Result},
};

/// Extract the bearer token from the Authorization header, if present.
fn bearer_token(parts: &Parts) -> Result<Option<&str>> {
    let auth_header = match parts.headers.get(axum::http::header::AUTHORIZATION) {
        Some(header) => header,
        None => return Ok(None),
    };

    let auth_str = auth_header.to_str().map_err(|e| Error::BadRequest {
        message: format!("Invalid authorization header: {e}"),
    })?;

    Ok(auth_str.strip_prefix("Bearer "))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts)?.ok_or_else(|| {
            trace!("No bearer token found in request");
            Error::Unauthenticated { message: None }
        })?;

        let claims = session::verify_session_token(token, &state.config)?;
        Ok(CurrentUser::from(claims))
    }
}

/// Gate an operation on the admin flag.
pub fn require_admin(user: &CurrentUser) -> Result<()> {
    if user.admin {
        Ok(())
    } else {
        Err(Error::Forbidden {
            message: "Not authorized to use this end-point".to_string(),
        })
    }
}
