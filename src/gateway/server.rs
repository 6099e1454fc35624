//! Gateway router construction and request handling.
//!
//! # Responsibilities
//! - Build one axum Router from the validated source configuration
//! - Wire per-prefix middleware (CORS, response timing) and the overlay
//!   sub-tree at `<prefix>/_`
//! - Per request: derive the cache key, get-or-create the compiled route,
//!   delegate serving to the bound source
//! - Run the server with graceful shutdown
//!
//! # Design Decisions
//! - One shared route cache instance injected into every prefix's state;
//!   no ambient globals
//! - Static-segment precedence in the router gives longest-prefix matching
//!   across overlapping prefixes
//! - Resolution failures surface as 502 and are never cached

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::{CacheKey, RouteCache};
use crate::config::schema::{GatewayConfig, SourceConfig};
use crate::config::validation::{validate_sources, ValidationError};
use crate::gateway::entry::{RouteBuildError, RouteEntry};
use crate::gateway::overlay::{self, OverlaySlot};
use crate::gateway::{middleware, request};
use crate::observability::metrics;
use crate::source::{ServeError, SharedResolver, SourceHandle, SourceInfo};
use crate::template::{CompiledTemplate, TemplateError};

/// Per-prefix state injected into handlers.
#[derive(Clone)]
pub struct PrefixState {
    pub config: Arc<SourceConfig>,
    pub template: Arc<CompiledTemplate>,
    pub cache: Arc<RouteCache<RouteEntry, RouteBuildError>>,
    pub resolver: SharedResolver,
    pub overlay: OverlaySlot,
    pub assets: Option<Arc<PathBuf>>,
}

/// Errors building the gateway from configuration.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid source configuration: {}", list_errors(.0))]
    Invalid(Vec<ValidationError>),

    #[error("prefix {prefix:?}: template failed to compile: {source}")]
    Template {
        prefix: String,
        #[source]
        source: TemplateError,
    },
}

fn list_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The assembled gateway: router plus the per-prefix states the overlay
/// prober works through.
pub struct Gateway {
    router: Router,
    states: Vec<PrefixState>,
}

impl Gateway {
    /// Build the router for a validated source mapping.
    ///
    /// Template compilation failures are fatal here, at load time, never
    /// deferred to the first request.
    pub fn new(
        settings: &GatewayConfig,
        sources: BTreeMap<String, SourceConfig>,
        resolver: SharedResolver,
    ) -> Result<Self, GatewayError> {
        validate_sources(&sources).map_err(GatewayError::Invalid)?;

        let cache = Arc::new(RouteCache::new(settings.route_cache.capacity));
        let assets = settings.assets.dir.clone().map(Arc::new);

        let mut router = Router::new();
        let mut states = Vec::with_capacity(sources.len());
        for (prefix, config) in sources {
            let template =
                CompiledTemplate::compile(&config.template).map_err(|source| {
                    GatewayError::Template {
                        prefix: prefix.clone(),
                        source,
                    }
                })?;
            let state = PrefixState {
                config: Arc::new(config),
                template: Arc::new(template),
                cache: Arc::clone(&cache),
                resolver: Arc::clone(&resolver),
                overlay: Arc::new(ArcSwapOption::new(None)),
                assets: assets.clone(),
            };
            router = router.nest(&prefix, prefix_router(state.clone()));
            states.push(state);
        }

        Ok(Self {
            router: router.layer(TraceLayer::new_for_http()),
            states,
        })
    }

    /// A clone of the assembled router, for embedding or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Probe and mount every prefix's overlay, waiting for all probes.
    ///
    /// `run` does this in the background instead; this form exists for
    /// embedders and tests that need a deterministic mount point.
    pub async fn mount_overlays(&self) {
        futures_util::future::join_all(self.states.iter().cloned().map(overlay::mount)).await;
    }

    /// Serve until shutdown. Overlay probes run in the background so every
    /// prefix's primary route is servable immediately.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        for state in self.states.iter().cloned() {
            tokio::spawn(overlay::mount(state));
        }

        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, prefixes = self.states.len(), "gateway serving");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("gateway stopped");
        Ok(())
    }
}

/// Build one prefix's sub-router: primary tile routes, the `/_` overlay
/// tree, and the prefix's middleware stack.
fn prefix_router(state: PrefixState) -> Router {
    let overlay = Router::new()
        .route("/", any(overlay_handler))
        .route("/{*path}", any(overlay_handler))
        .with_state(state.clone());

    let mut router = Router::new()
        .route("/", any(tile_handler))
        .route("/{*path}", any(tile_handler))
        .with_state(state.clone())
        .nest("/_", overlay);

    if state.config.cors {
        router = router.layer(CorsLayer::permissive());
    }
    if state.config.timing {
        router = router.layer(from_fn(middleware::response_time));
    }
    router
}

async fn tile_handler(State(state): State<PrefixState>, req: Request) -> Response {
    let response = serve_primary(&state, req).await;
    metrics::record_request(response.status().as_u16());
    response
}

async fn overlay_handler(State(state): State<PrefixState>, req: Request) -> Response {
    let response = match state.overlay.load_full() {
        Some(entry) => serve_from_source(&state, &entry.source, Some(&entry.info), req).await,
        None => (
            StatusCode::NOT_FOUND,
            "no inspection overlay for this source",
        )
            .into_response(),
    };
    metrics::record_request(response.status().as_u16());
    response
}

async fn serve_primary(state: &PrefixState, req: Request) -> Response {
    let supplied = request::query_params(req.uri().query());
    let key = CacheKey::for_request(&state.config.prefix, &supplied);
    let params = request::effective_params(&state.config.default_params, &supplied);

    let template = Arc::clone(&state.template);
    let resolver = Arc::clone(&state.resolver);
    let config = Arc::clone(&state.config);
    let entry = state
        .cache
        .get_or_create(key.clone(), move || {
            RouteEntry::build(template, resolver, config, params)
        })
        .await;

    let entry = match entry {
        Ok(entry) => entry,
        Err(error) => {
            tracing::warn!(key = %key, %error, "failed to compile route");
            return (StatusCode::BAD_GATEWAY, "failed to resolve tile source").into_response();
        }
    };

    serve_from_source(state, &entry.source, None, req).await
}

/// Dispatch one request against a resolved source: tile paths, the
/// metadata document, then static assets.
async fn serve_from_source(
    state: &PrefixState,
    source: &SourceHandle,
    probed_info: Option<&SourceInfo>,
    req: Request,
) -> Response {
    let path = req.uri().path();

    if path == "/index.json" {
        if let Some(info) = probed_info {
            return Json(info.clone()).into_response();
        }
        return match source.info().await {
            Ok(info) => Json(info).into_response(),
            Err(error) => {
                tracing::warn!(uri = %source.uri(), %error, "failed to describe source");
                (StatusCode::BAD_GATEWAY, "failed to describe source").into_response()
            }
        };
    }

    if let Some(coord) = request::parse_tile_path(path) {
        return match source.tile(coord).await {
            Ok(tile) => {
                ([(header::CONTENT_TYPE, tile.content_type)], tile.body).into_response()
            }
            Err(ServeError::NotFound) => StatusCode::NOT_FOUND.into_response(),
            Err(error) => {
                tracing::warn!(uri = %source.uri(), tile = %coord, %error, "tile serve failed");
                (StatusCode::BAD_GATEWAY, "upstream tile fetch failed").into_response()
            }
        };
    }

    serve_asset(state, req).await
}

async fn serve_asset(state: &PrefixState, req: Request) -> Response {
    let Some(dir) = &state.assets else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match ServeDir::new(dir.as_ref()).oneshot(req).await {
        Ok(response) => response.into_response(),
        Err(infallible) => match infallible {},
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    tracing::info!("shutdown signal received");
}
