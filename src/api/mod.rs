use crate::cli::globals::GlobalArgs;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, options},
    Extension, Router,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, warn, Span};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use self::handlers::auth::{
    self, AuthConfig, AuthState, NoopRateLimiter, RateLimiter, RedisCounterStore,
    SlidingWindowLimiter,
};
use self::handlers::{health, root};

// Keep these internal to the crate while allowing CLI/server wiring to reference them.
pub(crate) mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Assemble the full application: documented routes, swagger UI, rate-limit
/// middleware, and the shared layers.
pub(crate) fn app(pool: PgPool, auth_state: Arc<AuthState>) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_origin(Any);

    // Build the router from OpenAPI-wired routes, then extend it with non-doc
    // routes like `/` and preflight-only `OPTIONS /health`. The spec stays in
    // openapi.rs for the `openapi` binary.
    let (router, api_doc) = router().split_for_parts();
    router
        .route("/", get(root::root))
        .route("/health", options(health::health))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", api_doc))
        // Throttling runs inside the observability layers so 429s are traced
        // and carry a request id.
        .layer(axum::middleware::from_fn_with_state(
            auth_state.clone(),
            auth::admit_request,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth_state))
                .layer(Extension(pool)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, globals: &GlobalArgs) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let algorithm = globals
        .token_algorithm
        .parse()
        .map_err(|err| anyhow::anyhow!("Invalid token algorithm: {err:?}"))?;

    let config = AuthConfig::new()
        .with_algorithm(algorithm)
        .with_access_ttl_minutes(globals.access_ttl_minutes)
        .with_refresh_ttl_days(globals.refresh_ttl_days)
        .with_rate_limit_per_minute(globals.rate_limit_per_minute)
        .with_rate_limit_burst(globals.rate_limit_burst);

    let rate_limiter: Arc<dyn RateLimiter> = match globals.redis_url.as_deref() {
        Some(url) => {
            let store = RedisCounterStore::connect(url)
                .await
                .context("Failed to connect to Redis")?;
            Arc::new(SlidingWindowLimiter::new(
                store,
                config.rate_limit_per_minute(),
                config.rate_limit_burst(),
            ))
        }
        None => {
            warn!("No Redis URL configured; request rate limiting is disabled");
            Arc::new(NoopRateLimiter)
        }
    };

    let auth_state = Arc::new(AuthState::new(config, &globals.token_secret, rate_limiter));

    let app = app(pool, auth_state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Gracefully shutdown");
    })
    .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
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
