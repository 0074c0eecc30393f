use crate::{auth::AuthState, store::SharedStore};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;

pub mod handlers;
mod openapi;

pub use openapi::openapi;

use handlers::{auth, feed, guides, health, trips};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the application router with the store and auth state attached.
///
/// CORS is left to the caller so tests can drive the router directly.
#[must_use]
pub fn router(store: SharedStore, auth_state: AuthState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health).options(health::health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/trips", post(trips::create_trip).get(trips::list_trips))
        .route("/api/trips/{trip_id}/apply", post(trips::apply_to_trip))
        .route(
            "/api/guides",
            post(guides::create_guide).get(guides::list_guides),
        )
        .route("/api/guides/{guide_id}/reviews", get(guides::list_reviews))
        .route("/api/reviews", post(guides::create_review))
        .route("/api/feed", post(feed::create_post).get(feed::list_posts))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth_state))
                .layer(Extension(store)),
        )
}

/// Start the server
/// # Errors
/// Return error if the CORS origin is invalid or the listener fails
pub async fn new(
    port: u16,
    store: SharedStore,
    auth_state: AuthState,
    cors_allow_origin: &str,
) -> Result<()> {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(allow_origin(cors_allow_origin)?);

    let backend = store.backend();
    let app = router(store, auth_state).layer(cors);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{port} with {backend} store");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn allow_origin(origins: &str) -> Result<AllowOrigin> {
    if origins.trim() == "*" {
        return Ok(AllowOrigin::any());
    }

    let values = origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("Invalid CORS origin: {origin}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AllowOrigin::list(values))
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
