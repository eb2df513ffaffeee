// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, question, survey, users},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, surveys, questions, users).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (stores, config, sampler RNG).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    // Any authenticated identity may read or submit any survey.
    let survey_routes = Router::new()
        .route("/surveys", post(survey::create_survey))
        .route(
            "/surveys/{id}",
            get(survey::get_survey).put(survey::submit_survey),
        )
        .route("/results/{id}", get(survey::get_survey_result))
        .route("/slots/{id}", get(survey::get_result_slot))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let question_routes = Router::new()
        .route("/questions/{id}", get(question::get_question))
        .route("/questions/{id}/answers", get(question::list_question_answers))
        .route("/answers/{id}", get(question::get_answer));

    let user_routes = Router::new()
        .route(
            "/users/{id}",
            put(users::replace_user)
                .patch(users::patch_user)
                .delete(users::delete_user),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(survey_routes)
        .merge(question_routes)
        .merge(user_routes);

    Router::new()
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
