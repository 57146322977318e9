use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        DataResponse,
        simulations::{SimulationCreate, SimulationUpdate, value_to_stored_json},
        users::CurrentUser,
    },
    db::{
        errors::DbError,
        handlers::{Repository, Simulations},
        models::simulations::{SimulationCreateDBRequest, SimulationUpdateDBRequest},
    },
    errors::Error,
    types::SimulationId,
};

/// Persist a new simulation configuration for the authenticated user
#[utoipa::path(
    post,
    path = "/api/simulation-setup",
    request_body = SimulationCreate,
    tag = "simulation-setup",
    responses(
        (status = 201, description = "Settings saved"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = user.id))]
pub async fn create_simulation(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<SimulationCreate>,
) -> Result<(StatusCode, Json<DataResponse<String>>), Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut simulation_repo = Simulations::new(&mut conn);

    simulation_repo
        .create(&SimulationCreateDBRequest {
            user_id: user.id,
            name: request.name,
            settings: value_to_stored_json(&request.settings),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse::new("Settings saved".to_string()))))
}

/// Update an existing simulation configuration by ID
#[utoipa::path(
    put,
    path = "/api/simulation-setup/{id}",
    request_body = SimulationUpdate,
    tag = "simulation-setup",
    params(("id" = i64, Path, description = "Simulation ID")),
    responses(
        (status = 201, description = "Simulation updated"),
        (status = 404, description = "No such simulation"),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn update_simulation(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<SimulationId>,
    Json(request): Json<SimulationUpdate>,
) -> Result<(StatusCode, Json<DataResponse<String>>), Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut simulation_repo = Simulations::new(&mut conn);

    if simulation_repo.get_by_id(id).await?.is_none() {
        return Err(Error::NotFound {
            message: "Simulation not found!".to_string(),
        });
    }

    let affected = simulation_repo
        .update(
            id,
            &SimulationUpdateDBRequest {
                name: request.name,
                settings: request.settings.as_ref().map(value_to_stored_json),
                results: None,
            },
        )
        .await?;

    if affected == 0 {
        return Err(Error::NotFound {
            message: "Simulation not found!".to_string(),
        });
    }

    Ok((StatusCode::CREATED, Json(DataResponse::new("Simulation updated".to_string()))))
}

/// Delete a single simulation configuration by ID
#[utoipa::path(
    delete,
    path = "/api/simulation-setup/{id}",
    tag = "simulation-setup",
    params(("id" = i64, Path, description = "Simulation ID")),
    responses(
        (status = 201, description = "Simulation deleted"),
        (status = 404, description = "No such simulation"),
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(id))]
pub async fn delete_simulation(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<SimulationId>,
) -> Result<(StatusCode, Json<DataResponse<String>>), Error> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut simulation_repo = Simulations::new(&mut conn);

    if simulation_repo.get_by_id(id).await?.is_none() || simulation_repo.delete(id).await? == 0 {
        return Err(Error::NotFound {
            message: "Simulation not found!".to_string(),
        });
    }

    Ok((StatusCode::CREATED, Json(DataResponse::new("Simulation deleted".to_string()))))
}
