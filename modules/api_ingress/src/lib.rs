//! HTTP ingress: wraps the composed module router with the shared middleware
//! stack and serves it until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::http::HeaderValue;
use axum::{middleware::from_fn, routing::get, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;

pub const MODULE_NAME: &str = "api_ingress";

/// Owns the HTTP server and the middleware applied to every route.
pub struct ApiIngress {
    config: ArcSwap<ApiIngressConfig>,
}

impl Default for ApiIngress {
    fn default() -> Self {
        Self::new(ApiIngressConfig::default())
    }
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
        }
    }

    pub fn get_config(&self) -> ApiIngressConfig {
        (**self.config.load()).clone()
    }

    /// Add `/health` and wrap everything in the middleware stack.
    ///
    /// Layers from outermost to innermost:
    /// SetRequestId -> PropagateRequestId -> Trace -> push_req_id_to_extensions -> CORS -> Timeout -> BodyLimit
    pub fn build_router(&self, routes: Router) -> Router {
        let config = self.config.load();
        let x_request_id = request_id::header();

        let mut router = routes
            .route("/health", get(web::health_check))
            .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
            .layer(TimeoutLayer::new(config.request_timeout));

        if let Some(cors) = cors_layer(&config.cors_allowed_origins) {
            router = router.layer(cors);
        }

        router
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(request_id::create_trace_layer())
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
    }

    /// Bind `addr` and serve `router` until `shutdown` resolves.
    pub async fn serve<F>(&self, router: Router, addr: SocketAddr, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
        tracing::info!("HTTP server bound on {}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("HTTP server shutting down gracefully");
            })
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }
    if origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

#[async_trait]
impl modkit::Module for ApiIngress {
    async fn init(&self, ctx: &modkit::ModuleCtx) -> anyhow::Result<()> {
        let cfg = ctx.module_config::<ApiIngressConfig>();
        tracing::debug!(
            module = MODULE_NAME,
            cors_origins = cfg.cors_allowed_origins.len(),
            timeout = ?cfg.request_timeout,
            "ingress configured"
        );
        self.config.store(Arc::new(cfg));
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
