use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::handlers;
use crate::AppState;

pub fn app_routes(state: AppState) -> Router {
    // Everything in here sits behind the login gate
    let protected: Router<AppState> = Router::new()
        .route("/dashboard", get(handlers::dashboard))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_login,
        ));

    Router::new()
        .route("/", get(handlers::landing))
        .route("/health", get(handlers::health_check))
        // Auth routes
        .route("/auth/google", get(auth::auth_google))
        .route("/auth/google/callback", get(auth::auth_callback))
        .route("/logout", get(auth::auth_logout))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
