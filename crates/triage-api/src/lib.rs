//! JSON REST API for Triage SLA policies.
//!
//! Exposes an axum [`Router`] backed by any [`triage_core::store::PolicyStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility. The SLA
//! evaluator is deliberately not routed here; ticket handlers invoke it
//! in-process.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", triage_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod extract;
pub mod policies;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use triage_core::store::PolicyStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: PolicyStore + 'static,
{
  Router::new()
    .route(
      "/sla-policies",
      get(policies::list::<S>).post(policies::create::<S>),
    )
    .route("/sla-policies/reorder", post(policies::reorder::<S>))
    .route("/sla-policies/compact", post(policies::compact::<S>))
    .route(
      "/sla-policies/{id}",
      get(policies::get_one::<S>)
        .patch(policies::update::<S>)
        .delete(policies::delete_one::<S>),
    )
    .with_state(store)
}

// ─── Router tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use serde_json::{Value, json};
  use triage_core::policy::SlaPolicy;
  use triage_store_sqlite::SqlitePolicyStore;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use crate::policies::PolicyList;

  async fn make_router() -> Router {
    let store = SqlitePolicyStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store))
  }

  async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    router.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
  }

  async fn json_body<T: serde::de::DeserializeOwned>(resp: Response) -> T {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn create(router: &Router, body: Value) -> SlaPolicy {
    let resp = send(router, "POST", "/sla-policies", Some(body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await
  }

  async fn list(router: &Router) -> PolicyList {
    let resp = send(router, "GET", "/sla-policies", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    json_body(resp).await
  }

  // ── Create / get ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_then_get_returns_policy() {
    let router = make_router().await;
    let created = create(
      &router,
      json!({
        "title": "Urgent",
        "filter": { "priority": "urgent", "group_id": 7 },
        "metrics": [
          { "priority": "urgent", "target": "first_reply_time", "minutes": 15 }
        ]
      }),
    )
    .await;
    assert_eq!(created.position, 0);
    assert_eq!(created.filter.group_id.as_ref().map(|g| g.as_str()), Some("7"));

    let resp = send(
      &router,
      "GET",
      &format!("/sla-policies/{}", created.policy_id),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: SlaPolicy = json_body(resp).await;
    assert_eq!(fetched.policy_id, created.policy_id);
    assert_eq!(fetched.metrics.len(), 1);
  }

  #[tokio::test]
  async fn get_unknown_returns_404() {
    let router = make_router().await;
    let resp = send(&router, "GET", &format!("/sla-policies/{}", Uuid::new_v4()), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn create_with_blank_title_returns_400() {
    let router = make_router().await;
    let resp = send(&router, "POST", "/sla-policies", Some(json!({ "title": " " }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Update ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn patch_updates_title() {
    let router = make_router().await;
    let created = create(&router, json!({ "title": "old" })).await;

    let resp = send(
      &router,
      "PATCH",
      &format!("/sla-policies/{}", created.policy_id),
      Some(json!({ "title": "new" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: SlaPolicy = json_body(resp).await;
    assert_eq!(updated.title, "new");
  }

  #[tokio::test]
  async fn patch_unknown_returns_404() {
    let router = make_router().await;
    let resp = send(
      &router,
      "PATCH",
      &format!("/sla-policies/{}", Uuid::new_v4()),
      Some(json!({ "title": "new" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Delete ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn delete_hides_policy_and_compacts() {
    let router = make_router().await;
    let a = create(&router, json!({ "title": "a" })).await;
    let b = create(&router, json!({ "title": "b" })).await;

    let resp = send(&router, "DELETE", &format!("/sla-policies/{}", a.policy_id), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let deleted: SlaPolicy = json_body(resp).await;
    assert!(deleted.is_deleted);

    let listed = list(&router).await;
    assert_eq!(listed.policies.len(), 1);
    assert_eq!(listed.policies[0].policy_id, b.policy_id);
    assert_eq!(listed.policies[0].position, 0);

    let resp = send(&router, "GET", "/sla-policies?include_deleted=true", None).await;
    let all: PolicyList = json_body(resp).await;
    assert_eq!(all.policies.len(), 2);

    // Still retrievable by id.
    let resp = send(&router, "GET", &format!("/sla-policies/{}", a.policy_id), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn delete_unknown_returns_404() {
    let router = make_router().await;
    let resp = send(&router, "DELETE", &format!("/sla-policies/{}", Uuid::new_v4()), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Reorder ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn reorder_changes_list_order() {
    let router = make_router().await;
    let a = create(&router, json!({ "title": "a" })).await;
    let b = create(&router, json!({ "title": "b" })).await;
    let version = list(&router).await.version;

    let resp = send(
      &router,
      "POST",
      "/sla-policies/reorder",
      Some(json!({ "ids": [b.policy_id, a.policy_id], "version": version })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let listed = list(&router).await;
    let order: Vec<_> = listed.policies.iter().map(|p| p.policy_id).collect();
    assert_eq!(order, vec![b.policy_id, a.policy_id]);
    assert!(listed.version > version);
  }

  #[tokio::test]
  async fn reorder_with_stale_version_returns_409() {
    let router = make_router().await;
    let a = create(&router, json!({ "title": "a" })).await;
    let stale = list(&router).await.version;
    let b = create(&router, json!({ "title": "b" })).await;

    let resp = send(
      &router,
      "POST",
      "/sla-policies/reorder",
      Some(json!({ "ids": [b.policy_id, a.policy_id], "version": stale })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn reorder_with_non_sequence_body_returns_400_json() {
    let router = make_router().await;
    let resp = send(
      &router,
      "POST",
      "/sla-policies/reorder",
      Some(json!({ "ids": "not-a-list" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(resp).await;
    assert!(body["error"].as_str().is_some_and(|m| m.contains("ids")));
  }

  #[tokio::test]
  async fn malformed_json_returns_400_json() {
    let router = make_router().await;
    let req = Request::post("/sla-policies")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from("{not json"))
      .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(resp).await;
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn create_with_unknown_filter_criterion_returns_400() {
    let router = make_router().await;
    let resp = send(
      &router,
      "POST",
      "/sla-policies",
      Some(json!({ "title": "typo", "filter": { "group": 7 } })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert!(list(&router).await.policies.is_empty());
  }

  #[tokio::test]
  async fn reorder_with_duplicates_returns_400() {
    let router = make_router().await;
    let a = create(&router, json!({ "title": "a" })).await;
    let resp = send(
      &router,
      "POST",
      "/sla-policies/reorder",
      Some(json!({ "ids": [a.policy_id, a.policy_id] })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Compact ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn compact_renumbers_explicit_gaps() {
    let router = make_router().await;
    create(&router, json!({ "title": "a", "position": 4 })).await;
    create(&router, json!({ "title": "b", "position": 9 })).await;

    let resp = send(&router, "POST", "/sla-policies/compact", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let compacted: Vec<SlaPolicy> = json_body(resp).await;
    let positions: Vec<_> = compacted.iter().map(|p| p.position).collect();
    assert_eq!(positions, vec![0, 1]);
  }
}
