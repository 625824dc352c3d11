//! HTTP server assembly for Triage.
//!
//! Mounts the policy API under `/api` with request tracing, plus a plain
//! `/health` probe.

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use triage_core::store::PolicyStore;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `TRIAGE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// SQLite database file; a leading `~/` is expanded.
  pub store_path: PathBuf,
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router over `store`.
pub fn app<S>(store: Arc<S>) -> Router
where
  S: PolicyStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api", triage_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str { "ok" }

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt as _;
  use triage_store_sqlite::SqlitePolicyStore;

  async fn make_app() -> Router {
    let store = SqlitePolicyStore::open_in_memory().await.unwrap();
    app(Arc::new(store))
  }

  #[tokio::test]
  async fn health_returns_ok() {
    let resp = make_app()
      .await
      .oneshot(Request::get("/health").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn api_is_nested_under_prefix() {
    let app = make_app().await;
    let resp = app
      .clone()
      .oneshot(Request::get("/api/sla-policies").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
      .oneshot(Request::get("/sla-policies").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn address_joins_host_and_port() {
    let cfg = ServerConfig {
      host:       "0.0.0.0".into(),
      port:       8080,
      store_path: PathBuf::from("triage.db"),
    };
    assert_eq!(cfg.address(), "0.0.0.0:8080");
  }
}
