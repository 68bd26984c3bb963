use axum::{
    http::{HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, middleware as app_middleware, state::AppState};

pub fn build_router(state: AppState) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new().route("/api/health", get(handlers::health));

    // Any signed-in user; students scan and read their history here
    let user_routes = Router::new()
        .route("/api/attendance/scan", post(handlers::scan::scan_qr))
        .route("/api/attendance/me", get(handlers::reports::my_attendance))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth,
        ));

    // Teacher-only session, roll and summary endpoints
    let teacher_routes = Router::new()
        .route("/api/sessions", post(handlers::sessions::issue_session))
        .route(
            "/api/sessions/active",
            get(handlers::sessions::get_active_session),
        )
        .route(
            "/api/sessions/{id}/expiration",
            put(handlers::sessions::extend_session),
        )
        .route(
            "/api/sessions/{id}/attendance",
            get(handlers::roll::list_session_attendance).post(handlers::roll::add_manual_attendance),
        )
        .route(
            "/api/attendance/summary",
            get(handlers::reports::attendance_summary),
        )
        .route(
            "/api/attendance/{id}",
            put(handlers::roll::update_attendance).delete(handlers::roll::delete_attendance),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth_teacher,
        ));

    let cors = cors_layer(&state.config.cors_allow_origins);

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(teacher_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(app_middleware::request_id))
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(24 * 60 * 60))
}
