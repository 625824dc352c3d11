//! SLA policy types.
//!
//! A policy pairs a match filter with per-priority time targets. Policies are
//! evaluated in `position` order; the first whose filter matches a ticket
//! supplies its targets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  ticket::{GroupId, Priority},
};

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Criteria a ticket must satisfy for a policy to apply.
///
/// Every criterion is optional. Present criteria are AND-ed together; a filter
/// with no criteria at all is a catch-all and matches every ticket. Unknown
/// criterion names are rejected rather than ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFilter {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub priority:    Option<Priority>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub group_id:    Option<GroupId>,
  #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
  pub ticket_type: Option<String>,
  #[serde(default, alias = "channel", skip_serializing_if = "Option::is_none")]
  pub source:      Option<String>,
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

/// Which clock a metric sets a deadline for.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TargetKind {
  /// Time from ticket creation to the first agent reply.
  FirstReplyTime,
  /// Time from ticket creation to ticket closure.
  ResolutionTime,
}

/// A single time target: tickets of `priority` must reach `target` within
/// `minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyMetric {
  pub priority: Priority,
  pub target:   TargetKind,
  pub minutes:  u32,
}

impl PolicyMetric {
  pub fn new(priority: Priority, target: TargetKind, minutes: u32) -> Self {
    Self { priority, target, minutes }
  }
}

// ─── SlaPolicy ───────────────────────────────────────────────────────────────

/// A persisted SLA policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaPolicy {
  pub policy_id:   Uuid,
  pub title:       String,
  pub description: Option<String>,
  /// Evaluation rank; lower positions are tried first.
  pub position:    u32,
  pub filter:      PolicyFilter,
  /// Ordered; when two entries share a `(priority, target)` pair the earlier
  /// one wins.
  pub metrics:     Vec<PolicyMetric>,
  pub is_deleted:  bool,
  pub deleted_at:  Option<DateTime<Utc>>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  /// Store-allocated creation sequence; breaks ties between equal positions.
  pub created_seq: u64,
}

impl SlaPolicy {
  /// The first metric for `priority` and `target`, if any.
  pub fn metric_for(
    &self,
    priority: Priority,
    target: TargetKind,
  ) -> Option<&PolicyMetric> {
    self
      .metrics
      .iter()
      .find(|m| m.priority == priority && m.target == target)
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::PolicyStore::create`].
///
/// Timestamps, the id and the creation sequence are assigned by the store.
/// When `position` is `None` the policy is appended after every non-deleted
/// policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPolicy {
  pub title:       String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub position:    Option<u32>,
  #[serde(default)]
  pub filter:      PolicyFilter,
  #[serde(default)]
  pub metrics:     Vec<PolicyMetric>,
}

impl NewPolicy {
  pub fn new(title: impl Into<String>) -> Self {
    Self { title: title.into(), ..Default::default() }
  }

  pub fn with_filter(mut self, filter: PolicyFilter) -> Self {
    self.filter = filter;
    self
  }

  pub fn with_metric(
    mut self,
    priority: Priority,
    target: TargetKind,
    minutes: u32,
  ) -> Self {
    self.metrics.push(PolicyMetric::new(priority, target, minutes));
    self
  }

  pub fn validate(&self) -> Result<()> {
    validate_title(&self.title)?;
    validate_metrics(&self.metrics)
  }
}

/// Partial update accepted by [`crate::store::PolicyStore::update`].
///
/// `None` leaves a field untouched. `description: Some(None)` clears it.
/// Positions are deliberately absent: they change only through reorder and
/// compaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyPatch {
  #[serde(default)]
  pub title:       Option<String>,
  #[serde(default, with = "double_option")]
  pub description: Option<Option<String>>,
  #[serde(default)]
  pub filter:      Option<PolicyFilter>,
  #[serde(default)]
  pub metrics:     Option<Vec<PolicyMetric>>,
}

impl PolicyPatch {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.description.is_none()
      && self.filter.is_none()
      && self.metrics.is_none()
  }

  pub fn validate(&self) -> Result<()> {
    if let Some(title) = &self.title {
      validate_title(title)?;
    }
    if let Some(metrics) = &self.metrics {
      validate_metrics(metrics)?;
    }
    Ok(())
  }

  /// Apply the patch to `policy` in place.
  pub fn apply(self, policy: &mut SlaPolicy) {
    if let Some(title) = self.title {
      policy.title = title;
    }
    if let Some(description) = self.description {
      policy.description = description;
    }
    if let Some(filter) = self.filter {
      policy.filter = filter;
    }
    if let Some(metrics) = self.metrics {
      policy.metrics = metrics;
    }
  }
}

fn validate_title(title: &str) -> Result<()> {
  if title.trim().is_empty() {
    return Err(Error::InvalidInput("policy title must not be empty".into()));
  }
  Ok(())
}

fn validate_metrics(metrics: &[PolicyMetric]) -> Result<()> {
  if let Some(m) = metrics.iter().find(|m| m.minutes == 0) {
    return Err(Error::InvalidInput(format!(
      "{} target for {} priority must be at least one minute",
      m.target, m.priority
    )));
  }
  Ok(())
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
  use serde::{Deserialize, Deserializer, Serialize, Serializer};

  pub fn serialize<S, T>(
    value: &Option<Option<T>>,
    serializer: S,
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
    T: Serialize,
  {
    match value {
      Some(inner) => inner.serialize(serializer),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D, T>(
    deserializer: D,
  ) -> Result<Option<Option<T>>, D::Error>
  where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
  {
    Option::<T>::deserialize(deserializer).map(Some)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn metric_for_returns_first_duplicate() {
    let now = Utc::now();
    let policy = SlaPolicy {
      policy_id:   Uuid::new_v4(),
      title:       "dupes".into(),
      description: None,
      position:    0,
      filter:      PolicyFilter::default(),
      metrics:     vec![
        PolicyMetric::new(Priority::High, TargetKind::FirstReplyTime, 30),
        PolicyMetric::new(Priority::High, TargetKind::FirstReplyTime, 90),
      ],
      is_deleted:  false,
      deleted_at:  None,
      created_at:  now,
      updated_at:  now,
      created_seq: 1,
    };

    let m = policy
      .metric_for(Priority::High, TargetKind::FirstReplyTime)
      .unwrap();
    assert_eq!(m.minutes, 30);
    assert!(policy.metric_for(Priority::High, TargetKind::ResolutionTime).is_none());
  }

  #[test]
  fn validate_rejects_blank_title_and_zero_minutes() {
    assert!(matches!(
      NewPolicy::new("  ").validate(),
      Err(Error::InvalidInput(_))
    ));
    let zero = NewPolicy::new("zero").with_metric(
      Priority::Low,
      TargetKind::ResolutionTime,
      0,
    );
    assert!(matches!(zero.validate(), Err(Error::InvalidInput(_))));
  }

  #[test]
  fn patch_distinguishes_null_from_absent_description() {
    let cleared: PolicyPatch =
      serde_json::from_str(r#"{"description": null}"#).unwrap();
    assert_eq!(cleared.description, Some(None));

    let untouched: PolicyPatch = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
    assert_eq!(untouched.description, None);
  }

  #[test]
  fn filter_uses_type_key_on_the_wire() {
    let filter: PolicyFilter =
      serde_json::from_str(r#"{"priority": "urgent", "type": "incident"}"#)
        .unwrap();
    assert_eq!(filter.priority, Some(Priority::Urgent));
    assert_eq!(filter.ticket_type.as_deref(), Some("incident"));
    assert!(filter.group_id.is_none());
  }

  #[test]
  fn filter_rejects_unknown_criteria() {
    assert!(serde_json::from_str::<PolicyFilter>(r#"{"group": 7}"#).is_err());
    assert!(serde_json::from_str::<NewPolicy>(
      r#"{"title": "typo", "filter": {"prio": "urgent"}}"#
    )
    .is_err());
  }

  #[test]
  fn filter_accepts_channel_for_source() {
    let filter: PolicyFilter =
      serde_json::from_str(r#"{"channel": "email"}"#).unwrap();
    assert_eq!(filter.source.as_deref(), Some("email"));
  }
}
