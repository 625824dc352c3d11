//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Filter criteria live in one
//! nullable column each; metrics are stored as a compact JSON array. UUIDs are
//! stored as hyphenated lowercase strings.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use triage_core::{
  policy::{PolicyFilter, PolicyMetric, SlaPolicy},
  ticket::{GroupId, Priority},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Priority ─────────────────────────────────────────────────────────────────

pub fn decode_priority(s: &str) -> Result<Priority> {
  Priority::from_str(s)
    .map_err(|_| Error::Decode(format!("unknown priority: {s:?}")))
}

// ─── Filter ───────────────────────────────────────────────────────────────────

/// Column values for `filter_priority`, `filter_group_id`, `filter_type` and
/// `filter_source`, in that order.
pub struct FilterColumns {
  pub priority:    Option<String>,
  pub group_id:    Option<String>,
  pub ticket_type: Option<String>,
  pub source:      Option<String>,
}

pub fn encode_filter(filter: &PolicyFilter) -> FilterColumns {
  FilterColumns {
    priority:    filter.priority.map(|p| p.as_ref().to_owned()),
    group_id:    filter.group_id.as_ref().map(|g| g.as_str().to_owned()),
    ticket_type: filter.ticket_type.clone(),
    source:      filter.source.clone(),
  }
}

// ─── Metrics ──────────────────────────────────────────────────────────────────

pub fn encode_metrics(metrics: &[PolicyMetric]) -> Result<String> {
  Ok(serde_json::to_string(metrics)?)
}

pub fn decode_metrics(s: &str) -> Result<Vec<PolicyMetric>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawPolicy::from_row`].
pub const POLICY_COLUMNS: &str = "policy_id, title, description, position,
  filter_priority, filter_group_id, filter_type, filter_source, metrics_json,
  is_deleted, deleted_at, created_at, updated_at, created_seq";

/// Evaluation order, with creation sequence and id as tie-breakers.
pub const POLICY_ORDER: &str = "ORDER BY position ASC, created_seq ASC, policy_id ASC";

/// Raw values read directly from an `sla_policies` row.
pub struct RawPolicy {
  pub policy_id:       String,
  pub title:           String,
  pub description:     Option<String>,
  pub position:        u32,
  pub filter_priority: Option<String>,
  pub filter_group_id: Option<String>,
  pub filter_type:     Option<String>,
  pub filter_source:   Option<String>,
  pub metrics_json:    String,
  pub is_deleted:      bool,
  pub deleted_at:      Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
  pub created_seq:     i64,
}

impl RawPolicy {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      policy_id:       row.get(0)?,
      title:           row.get(1)?,
      description:     row.get(2)?,
      position:        row.get(3)?,
      filter_priority: row.get(4)?,
      filter_group_id: row.get(5)?,
      filter_type:     row.get(6)?,
      filter_source:   row.get(7)?,
      metrics_json:    row.get(8)?,
      is_deleted:      row.get(9)?,
      deleted_at:      row.get(10)?,
      created_at:      row.get(11)?,
      updated_at:      row.get(12)?,
      created_seq:     row.get(13)?,
    })
  }

  pub fn into_policy(self) -> Result<SlaPolicy> {
    let filter = PolicyFilter {
      priority:    self
        .filter_priority
        .as_deref()
        .map(decode_priority)
        .transpose()?,
      group_id:    self.filter_group_id.map(GroupId::new),
      ticket_type: self.filter_type,
      source:      self.filter_source,
    };

    let created_seq = u64::try_from(self.created_seq)
      .map_err(|_| Error::Decode(format!("negative created_seq: {}", self.created_seq)))?;

    Ok(SlaPolicy {
      policy_id: decode_uuid(&self.policy_id)?,
      title: self.title,
      description: self.description,
      position: self.position,
      filter,
      metrics: decode_metrics(&self.metrics_json)?,
      is_deleted: self.is_deleted,
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      created_seq,
    })
  }
}
