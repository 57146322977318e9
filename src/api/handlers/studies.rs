use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        DataResponse,
        studies::{StudyCreate, StudyResponse, StudyUpdate},
        users::CurrentUser,
    },
    db::{
        errors::DbError,
        handlers::{Repository, Studies},
        models::studies::{StudyCreateDBRequest, StudyUpdateDBRequest},
    },
    errors::Error,
    types::StudyId,
};

/// List all studies
#[utoipa::path(
    get,
    path = "/api/studies",
    tag = "studies",
    responses(
        (status = 200, description = "All studies", body = DataResponse<Vec<StudyResponse>>),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_studies(State(state): State<AppState>, _user: CurrentUser) -> Result<Json<DataResponse<Vec<StudyResponse>>>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut study_repo = Studies::new(&mut conn);
    let studies = study_repo.list().await?;

    Ok(Json(DataResponse::new(studies.into_iter().map(StudyResponse::from).collect())))
}

/// Get a single study by ID
#[utoipa::path(
    get,
    path = "/api/studies/{id}",
    tag = "studies",
    params(("id" = i64, Path, description = "Study ID")),
    responses(
        (status = 200, description = "The study", body = StudyResponse),
        (status = 404, description = "No such study"),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn get_study(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<StudyId>,
) -> Result<Json<StudyResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut study_repo = Studies::new(&mut conn);

    let study = study_repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        message: "Study not found!".to_string(),
    })?;

    Ok(Json(StudyResponse::from(study)))
}

/// Create a new study
#[utoipa::path(
    post,
    path = "/api/studies",
    request_body = StudyCreate,
    tag = "studies",
    responses(
        (status = 201, description = "Study created"),
        (status = 400, description = "Missing study name"),
        (status = 409, description = "Name already taken"),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_study(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<StudyCreate>,
) -> Result<(StatusCode, Json<DataResponse<String>>), Error> {
    let study_name = match request.study_name.filter(|n| !n.is_empty()) {
        Some(name) => name,
        None => {
            return Err(Error::BadRequest {
                message: "Missing study name".to_string(),
            });
        }
    };

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut study_repo = Studies::new(&mut conn);

    if study_repo.find_by_name(&study_name).await?.is_some() {
        return Err(Error::Conflict {
            message: "Study already exists!".to_string(),
        });
    }

    study_repo
        .create(&StudyCreateDBRequest {
            study_name,
            settings: request.settings,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse::new("Study created".to_string()))))
}

/// Update an existing study by ID
#[utoipa::path(
    put,
    path = "/api/studies/{id}",
    request_body = StudyUpdate,
    tag = "studies",
    params(("id" = i64, Path, description = "Study ID")),
    responses(
        (status = 201, description = "Study updated"),
        (status = 404, description = "No such study"),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn update_study(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<StudyId>,
    Json(request): Json<StudyUpdate>,
) -> Result<(StatusCode, Json<DataResponse<String>>), Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut study_repo = Studies::new(&mut conn);

    if study_repo.get_by_id(id).await?.is_none() {
        return Err(Error::NotFound {
            message: "Study not found!".to_string(),
        });
    }

    let affected = study_repo
        .update(
            id,
            &StudyUpdateDBRequest {
                study_name: request.study_name,
                settings: request.settings,
            },
        )
        .await?;

    if affected == 0 {
        return Err(Error::NotFound {
            message: "Study not found!".to_string(),
        });
    }

    Ok((StatusCode::CREATED, Json(DataResponse::new("Study updated".to_string()))))
}

/// Delete a single study by ID
#[utoipa::path(
    delete,
    path = "/api/studies/{id}",
    tag = "studies",
    params(("id" = i64, Path, description = "Study ID")),
    responses(
        (status = 201, description = "Study deleted"),
        (status = 404, description = "No such study"),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn delete_study(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<StudyId>,
) -> Result<(StatusCode, Json<DataResponse<String>>), Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut study_repo = Studies::new(&mut conn);

    if study_repo.get_by_id(id).await?.is_none() || study_repo.delete(id).await? == 0 {
        return Err(Error::NotFound {
            message: "Study not found!".to_string(),
        });
    }

    Ok((StatusCode::CREATED, Json(DataResponse::new("Study deleted".to_string()))))
}
