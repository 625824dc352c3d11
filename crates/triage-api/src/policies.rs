//! Handlers for `/sla-policies` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/sla-policies` | Optional `?include_deleted=true`; returns `{version, policies}` |
//! | `POST`   | `/sla-policies` | Body: [`NewPolicy`]; returns 201 + stored policy |
//! | `GET`    | `/sla-policies/:id` | 404 if not found; deleted policies are still returned |
//! | `PATCH`  | `/sla-policies/:id` | Body: [`PolicyPatch`] |
//! | `DELETE` | `/sla-policies/:id` | Soft delete, then compact survivors |
//! | `POST`   | `/sla-policies/reorder` | Body: `{"ids":[...],"version":N}`; 204 |
//! | `POST`   | `/sla-policies/compact` | Renumber survivors to `0..N-1` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use triage_core::{
  policy::{NewPolicy, PolicyPatch, SlaPolicy},
  store::PolicyStore,
};
use uuid::Uuid;

use crate::{error::ApiError, extract::ApiJson};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// If `true`, soft-deleted policies are included. Default `false`.
  #[serde(default)]
  pub include_deleted: bool,
}

/// Response body for `GET /sla-policies`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PolicyList {
  /// Pass back to `POST /sla-policies/reorder` to detect concurrent edits.
  pub version:  u64,
  pub policies: Vec<SlaPolicy>,
}

/// `GET /sla-policies[?include_deleted=true]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<PolicyList>, ApiError>
where
  S: PolicyStore,
{
  // Version first: a write landing in between makes the token stale, never
  // newer than the list it accompanies.
  let version = store.version().await.map_err(ApiError::from_store)?;
  let policies = store
    .list(params.include_deleted)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(PolicyList { version, policies }))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /sla-policies`: returns 201 + the stored [`SlaPolicy`].
pub async fn create<S>(
  State(store): State<Arc<S>>,
  ApiJson(body): ApiJson<NewPolicy>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PolicyStore,
{
  let policy = store.create(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(policy)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /sla-policies/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SlaPolicy>, ApiError>
where
  S: PolicyStore,
{
  let policy = store
    .get(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("sla policy {id} not found")))?;
  Ok(Json(policy))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /sla-policies/:id`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  ApiJson(patch): ApiJson<PolicyPatch>,
) -> Result<Json<SlaPolicy>, ApiError>
where
  S: PolicyStore,
{
  let policy = store.update(id, patch).await.map_err(ApiError::from_store)?;
  Ok(Json(policy))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /sla-policies/:id`: marks the policy deleted, then compacts the
/// remaining positions. Returns the deleted policy.
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SlaPolicy>, ApiError>
where
  S: PolicyStore,
{
  let policy = store.soft_delete(id).await.map_err(ApiError::from_store)?;
  store.compact().await.map_err(ApiError::from_store)?;
  Ok(Json(policy))
}

// ─── Reorder ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReorderBody {
  /// Every non-deleted policy id, in the desired evaluation order.
  pub ids:     Vec<Uuid>,
  /// Version token from a previous `GET /sla-policies`.
  #[serde(default)]
  pub version: Option<u64>,
}

/// `POST /sla-policies/reorder`: 204 on success, 409 on a stale version.
pub async fn reorder<S>(
  State(store): State<Arc<S>>,
  ApiJson(body): ApiJson<ReorderBody>,
) -> Result<StatusCode, ApiError>
where
  S: PolicyStore,
{
  store
    .reorder(body.ids, body.version)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Compact ──────────────────────────────────────────────────────────────────

/// `POST /sla-policies/compact`
pub async fn compact<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<SlaPolicy>>, ApiError>
where
  S: PolicyStore,
{
  let policies = store.compact().await.map_err(ApiError::from_store)?;
  Ok(Json(policies))
}
