use crate::error::ApiError;
use crate::handlers::{
    auth::{sign_in, sign_up},
    health::health_check,
    item::{create_item, list_items},
};
use crate::middleware::{auth::require_identity, rate_limit};
use crate::state::AppState;
use axum::{
    Router,
    handler::Handler,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::{any::Any, time::Duration};
use tower_governor::GovernorLayer;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub fn create_routes(state: AppState) -> Router {
    let limits = &state.config.rate_limit;

    // Auth endpoints are the ones worth brute-forcing, so they're the ones we throttle.
    let auth_routes = if limits.enabled {
        Router::new()
            .route(
                "/sign-up",
                post(sign_up.layer(GovernorLayer::new(rate_limit::create_signup_config(limits)))),
            )
            .route(
                "/sign-in",
                post(sign_in.layer(GovernorLayer::new(rate_limit::create_login_config(limits)))),
            )
    } else {
        Router::new()
            .route("/sign-up", post(sign_up))
            .route("/sign-in", post(sign_in))
    };

    // Everything under /api needs a valid bearer token. route_layer so unknown
    // paths still 404 instead of 401.
    let api_routes = Router::new()
        .route("/items", post(create_item).get(list_items))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_identity));

    let timeout = state.config.http.timeout;

    let router = Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes)
        .nest("/api", api_routes);

    apply_layers(router, timeout).with_state(state)
}

/// The middleware stack every route sits behind.
///
/// Layers run bottom-up on the way in: request id first, so the trace span and
/// every handler log line can see it. Panics are caught innermost, so even a
/// crashed handler comes back through the request-id and trace layers as a 500.
pub fn apply_layers<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods(cors::Any)
        .allow_headers(cors::Any);

    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic payload"
    };

    tracing::error!(op = "routes.handle_panic", panic = %detail, "handler panicked");

    ApiError::Internal("internal error").into_response()
}
