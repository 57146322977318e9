use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        DataResponse,
        pagination::{PaginatedResponse, Pagination},
        simulations::{SimulationResponse, SimulationResultsUpdate, value_to_stored_json},
        users::CurrentUser,
    },
    db::{
        errors::DbError,
        handlers::{Repository, Simulations},
        models::simulations::SimulationUpdateDBRequest,
    },
    errors::Error,
    types::{SimulationId, UserId},
};

fn require_user_id(user_id: UserId) -> Result<UserId, Error> {
    if user_id <= 0 {
        return Err(Error::BadRequest {
            message: "Missing user ID".to_string(),
        });
    }
    Ok(user_id)
}

/// Latest simulation configuration for a user (array with at most one entry)
#[utoipa::path(
    get,
    path = "/api/simulation-results/{user_id}",
    tag = "simulation-results",
    params(("user_id" = i64, Path, description = "Owning user ID")),
    responses(
        (status = 200, description = "The latest configuration, if any", body = DataResponse<Vec<SimulationResponse>>),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(user_id))]
pub async fn latest_for_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<DataResponse<Vec<SimulationResponse>>>, Error> {
    let user_id = require_user_id(user_id)?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut simulation_repo = Simulations::new(&mut conn);
    let latest = simulation_repo.latest_for_user(user_id).await?;

    Ok(Json(DataResponse::new(
        latest.into_iter().map(SimulationResponse::from).collect(),
    )))
}

/// All simulation configurations for a user
#[utoipa::path(
    get,
    path = "/api/simulation-results/all/{user_id}",
    tag = "simulation-results",
    params(("user_id" = i64, Path, description = "Owning user ID")),
    responses(
        (status = 200, description = "All configurations for the user", body = DataResponse<Vec<SimulationResponse>>),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(user_id))]
pub async fn all_for_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<DataResponse<Vec<SimulationResponse>>>, Error> {
    let user_id = require_user_id(user_id)?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut simulation_repo = Simulations::new(&mut conn);
    let simulations = simulation_repo.all_for_user(user_id).await?;

    Ok(Json(DataResponse::new(
        simulations.into_iter().map(SimulationResponse::from).collect(),
    )))
}

/// One page of a user's configurations, joined with the owner's email
#[utoipa::path(
    get,
    path = "/api/simulation-results/all/{user_id}/paginated",
    tag = "simulation-results",
    params(
        ("user_id" = i64, Path, description = "Owning user ID"),
        Pagination,
    ),
    responses(
        (status = 200, description = "One page plus the total count", body = PaginatedResponse<SimulationResponse>),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(user_id))]
pub async fn all_for_user_paginated(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(user_id): Path<UserId>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<SimulationResponse>>, Error> {
    let user_id = require_user_id(user_id)?;
    let (page, limit) = (pagination.page(), pagination.limit());

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut simulation_repo = Simulations::new(&mut conn);
    let (rows, total_count) = simulation_repo.all_for_user_paginated(user_id, page, limit).await?;

    Ok(Json(PaginatedResponse::new(
        rows.into_iter().map(SimulationResponse::from).collect(),
        total_count,
        page,
        limit,
    )))
}

/// The N most recent configurations for a user (results blob omitted)
#[utoipa::path(
    get,
    path = "/api/simulation-results/last/{user_id}/{limit}",
    tag = "simulation-results",
    params(
        ("user_id" = i64, Path, description = "Owning user ID"),
        ("limit" = i64, Path, description = "Number of rows to return"),
    ),
    responses(
        (status = 200, description = "Most recent configurations, newest first", body = DataResponse<Vec<SimulationResponse>>),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(user_id, limit))]
pub async fn last_for_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((user_id, limit)): Path<(UserId, i64)>,
) -> Result<Json<DataResponse<Vec<SimulationResponse>>>, Error> {
    let user_id = require_user_id(user_id)?;
    let limit = if limit > 0 { limit } else { 10 };

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut simulation_repo = Simulations::new(&mut conn);
    let simulations = simulation_repo.last_for_user(user_id, limit).await?;

    Ok(Json(DataResponse::new(
        simulations.into_iter().map(SimulationResponse::from).collect(),
    )))
}

/// One configuration in a user's scope (array with at most one entry)
#[utoipa::path(
    get,
    path = "/api/simulation-results/{user_id}/{simulation_id}",
    tag = "simulation-results",
    params(
        ("user_id" = i64, Path, description = "Owning user ID"),
        ("simulation_id" = i64, Path, description = "Simulation ID"),
    ),
    responses(
        (status = 200, description = "The configuration, if owned by the user", body = DataResponse<Vec<SimulationResponse>>),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(user_id, simulation_id))]
pub async fn for_user_by_id(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((user_id, simulation_id)): Path<(UserId, SimulationId)>,
) -> Result<Json<DataResponse<Vec<SimulationResponse>>>, Error> {
    let user_id = require_user_id(user_id)?;
    if simulation_id <= 0 {
        return Err(Error::BadRequest {
            message: "Missing simulation ID".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut simulation_repo = Simulations::new(&mut conn);
    let simulation = simulation_repo.for_user_by_id(user_id, simulation_id).await?;

    Ok(Json(DataResponse::new(
        simulation.into_iter().map(SimulationResponse::from).collect(),
    )))
}

/// Attach processing results to a simulation
#[utoipa::path(
    put,
    path = "/api/simulation-results/{simulation_id}",
    request_body = SimulationResultsUpdate,
    tag = "simulation-results",
    params(("simulation_id" = i64, Path, description = "Simulation ID")),
    responses(
        (status = 201, description = "Results attached"),
        (status = 404, description = "No such simulation"),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(simulation_id))]
pub async fn attach_results(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(simulation_id): Path<SimulationId>,
    Json(request): Json<SimulationResultsUpdate>,
) -> Result<(StatusCode, Json<DataResponse<String>>), Error> {
    if simulation_id <= 0 {
        return Err(Error::BadRequest {
            message: "Missing simulation ID".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut simulation_repo = Simulations::new(&mut conn);

    let affected = simulation_repo
        .update(
            simulation_id,
            &SimulationUpdateDBRequest {
                results: Some(value_to_stored_json(&request.results)),
                ..Default::default()
            },
        )
        .await?;

    if affected == 0 {
        return Err(Error::NotFound {
            message: "Simulation not found!".to_string(),
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new("Simulation updated with result".to_string())),
    ))
}
