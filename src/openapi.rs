//! OpenAPI documentation for the REST surface, served at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Registers the bearer-token security scheme every protected route refers to.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "bearer".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session token from POST /api/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "dekarpio API",
        description = "CRUD backend for configuring and reviewing energy-system simulations"
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::login,
        api::handlers::auth::check,
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::create_user,
        api::handlers::users::update_user,
        api::handlers::users::delete_user,
        api::handlers::studies::list_studies,
        api::handlers::studies::get_study,
        api::handlers::studies::create_study,
        api::handlers::studies::update_study,
        api::handlers::studies::delete_study,
        api::handlers::simulation_setup::create_simulation,
        api::handlers::simulation_setup::update_simulation,
        api::handlers::simulation_setup::delete_simulation,
        api::handlers::simulation_results::latest_for_user,
        api::handlers::simulation_results::all_for_user,
        api::handlers::simulation_results::all_for_user_paginated,
        api::handlers::simulation_results::last_for_user,
        api::handlers::simulation_results::for_user_by_id,
        api::handlers::simulation_results::attach_results,
    ),
    components(schemas(
        api::models::auth::LoginRequest,
        api::models::auth::TokenResponse,
        api::models::auth::TokenCheckResponse,
        api::models::users::UserCreate,
        api::models::users::UserUpdate,
        api::models::users::UserResponse,
        api::models::studies::StudyCreate,
        api::models::studies::StudyUpdate,
        api::models::studies::StudyResponse,
        api::models::simulations::SimulationCreate,
        api::models::simulations::SimulationUpdate,
        api::models::simulations::SimulationResultsUpdate,
        api::models::simulations::SimulationResponse,
    ))
)]
pub struct ApiDoc;
