use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        auth::{LoginRequest, TokenCheckResponse, TokenResponse},
        users::CurrentUser,
    },
    auth::{password, session},
    db::{errors::DbError, handlers::Users},
    errors::Error,
};

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Unknown user or wrong password"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<TokenResponse>, Error> {
    // The connection is scoped to the lookup and back in the pool before the
    // (slow) password verification runs.
    let user = {
        let mut conn = state.db.acquire().await.map_err(DbError::from)?;
        let mut user_repo = Users::new(&mut conn);
        user_repo.get_user_by_email(&request.email).await?
    }
    .ok_or_else(|| Error::Unauthenticated {
        message: Some("User not found".to_string()),
    })?;

    // Accounts seeded without a password cannot log in
    let password_hash = user
        .password
        .clone()
        .filter(|hash| !hash.is_empty())
        .ok_or_else(|| Error::Unauthenticated {
            message: Some("Auth failed".to_string()),
        })?;

    // Verify password on a blocking thread to avoid blocking the async runtime
    let candidate = request.password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&candidate, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::Unauthenticated {
            message: Some("Auth failed".to_string()),
        });
    }

    let current_user = CurrentUser::from(user);
    let token = session::create_session_token(&current_user, &state.config)?;

    Ok(Json(TokenResponse { token }))
}

/// Verify the presented bearer token and echo its claims
#[utoipa::path(
    get,
    path = "/api/auth/check",
    tag = "auth",
    responses(
        (status = 200, description = "Token is valid", body = TokenCheckResponse),
        (status = 401, description = "Missing, invalid, or expired token"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn check(user: CurrentUser) -> Json<TokenCheckResponse> {
    Json(TokenCheckResponse {
        id: user.id,
        admin: user.admin,
        email: user.email,
    })
}
