use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        DataResponse,
        users::{CurrentUser, UserCreate, UserResponse, UserUpdate},
    },
    auth::{middleware::require_admin, password},
    db::{
        errors::DbError,
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::Error,
    types::UserId,
};

/// List all users (admin only)
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses(
        (status = 200, description = "All users, password hashes stripped", body = DataResponse<Vec<UserResponse>>),
        (status = 403, description = "Caller is not an admin"),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>, user: CurrentUser) -> Result<Json<DataResponse<Vec<UserResponse>>>, Error> {
    require_admin(&user)?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut user_repo = Users::new(&mut conn);
    let users = user_repo.list().await?;

    Ok(Json(DataResponse::new(users.into_iter().map(UserResponse::from).collect())))
}

/// Get a single user by ID
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "The user, password hash stripped", body = DataResponse<UserResponse>),
        (status = 404, description = "No such user"),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn get_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<UserId>,
) -> Result<Json<DataResponse<UserResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut user_repo = Users::new(&mut conn);

    let user = user_repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        message: "User not found!".to_string(),
    })?;

    Ok(Json(DataResponse::new(UserResponse::from(user))))
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = UserCreate,
    tag = "users",
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Missing email or password"),
        (status = 409, description = "Email already registered"),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<UserCreate>,
) -> Result<(StatusCode, Json<DataResponse<String>>), Error> {
    let (email, password) = match (request.email, request.password) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => (email, password),
        _ => {
            return Err(Error::BadRequest {
                message: "Missing email or password".to_string(),
            });
        }
    };

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut user_repo = Users::new(&mut conn);

    if user_repo.get_user_by_email(&email).await?.is_some() {
        return Err(Error::Conflict {
            message: "User already exists!".to_string(),
        });
    }

    // Hash the password on a blocking thread to avoid blocking the async runtime
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string(&password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    user_repo
        .create(&UserCreateDBRequest {
            company: request.company.unwrap_or_default(),
            email,
            password_hash,
            admin: request.admin.unwrap_or(false),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse::new("User created".to_string()))))
}

/// Update an existing user by ID
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    request_body = UserUpdate,
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 201, description = "User updated"),
        (status = 404, description = "No such user"),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn update_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<UserId>,
    Json(request): Json<UserUpdate>,
) -> Result<(StatusCode, Json<DataResponse<String>>), Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut user_repo = Users::new(&mut conn);

    if user_repo.get_by_id(id).await?.is_none() {
        return Err(Error::NotFound {
            message: "User not found!".to_string(),
        });
    }

    // An empty password field from the edit form means "keep the current one"
    let password_hash = match request.password.filter(|p| !p.is_empty()) {
        Some(password) => Some(
            tokio::task::spawn_blocking(move || password::hash_string(&password))
                .await
                .map_err(|e| Error::Internal {
                    operation: format!("spawn password hashing task: {e}"),
                })??,
        ),
        None => None,
    };

    let affected = user_repo
        .update(
            id,
            &UserUpdateDBRequest {
                company: request.company,
                email: request.email,
                password_hash,
                admin: request.admin,
            },
        )
        .await?;

    if affected == 0 {
        return Err(Error::NotFound {
            message: "User not found!".to_string(),
        });
    }

    Ok((StatusCode::CREATED, Json(DataResponse::new("User updated".to_string()))))
}

/// Delete a single user by ID
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 201, description = "User deleted"),
        (status = 404, description = "No such user"),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn delete_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<UserId>,
) -> Result<(StatusCode, Json<DataResponse<String>>), Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut user_repo = Users::new(&mut conn);

    // The affected-row count covers the gap between this check and the
    // delete itself (a concurrent delete would otherwise report success).
    if user_repo.get_by_id(id).await?.is_none() || user_repo.delete(id).await? == 0 {
        return Err(Error::NotFound {
            message: "User not found!".to_string(),
        });
    }

    Ok((StatusCode::CREATED, Json(DataResponse::new("User deleted".to_string()))))
}
