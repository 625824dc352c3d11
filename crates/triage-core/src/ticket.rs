//! The read-only ticket attributes the SLA engine consumes.
//!
//! Tickets are owned by the ticket lifecycle service. The engine never
//! persists or mutates them; it only reads the attributes below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Priority ────────────────────────────────────────────────────────────────

/// Ticket priority. The lowercase literals are a wire contract with policy
/// filters and metrics.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
  Urgent,
  High,
  Normal,
  Low,
}

// ─── GroupId ─────────────────────────────────────────────────────────────────

/// A support group identifier, always held in string form.
///
/// Upstream records store group ids as numbers in some places and strings in
/// others; both deserialise to the same value so `7` and `"7"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawGroupId", into = "String")]
pub struct GroupId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawGroupId {
  Text(String),
  Number(i64),
}

impl From<RawGroupId> for GroupId {
  fn from(raw: RawGroupId) -> Self {
    match raw {
      RawGroupId::Text(s) => Self(s),
      RawGroupId::Number(n) => Self(n.to_string()),
    }
  }
}

impl From<GroupId> for String {
  fn from(id: GroupId) -> Self { id.0 }
}

impl GroupId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for GroupId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Ticket ──────────────────────────────────────────────────────────────────

/// The subset of a ticket record the SLA engine reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
  pub ticket_id:        Uuid,
  pub subject:          String,
  pub priority:         Priority,
  #[serde(default)]
  pub group_id:         Option<GroupId>,
  #[serde(default, rename = "type")]
  pub ticket_type:      Option<String>,
  /// Channel the ticket arrived through, e.g. `"email"` or `"portal"`.
  #[serde(default, alias = "channel")]
  pub source:           Option<String>,
  #[serde(default)]
  pub assignee_email:   Option<String>,
  pub created_at:       DateTime<Utc>,
  /// Set once an agent has replied; the first-reply target is then met.
  #[serde(default)]
  pub first_replied_at: Option<DateTime<Utc>>,
  /// Set once the ticket is closed; the resolution target is then met.
  #[serde(default)]
  pub resolved_at:      Option<DateTime<Utc>>,
}

impl Ticket {
  /// A ticket with only the required attributes set.
  pub fn new(subject: impl Into<String>, priority: Priority) -> Self {
    Self {
      ticket_id: Uuid::new_v4(),
      subject: subject.into(),
      priority,
      group_id: None,
      ticket_type: None,
      source: None,
      assignee_email: None,
      created_at: Utc::now(),
      first_replied_at: None,
      resolved_at: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  #[test]
  fn priority_literals_are_lowercase() {
    assert_eq!(Priority::Urgent.to_string(), "urgent");
    assert_eq!(Priority::from_str("normal").unwrap(), Priority::Normal);
    assert!(Priority::from_str("Urgent").is_err());
  }

  #[test]
  fn group_id_accepts_numbers_and_strings() {
    let from_num: GroupId = serde_json::from_str("42").unwrap();
    let from_str: GroupId = serde_json::from_str("\"42\"").unwrap();
    assert_eq!(from_num, from_str);
    assert_eq!(serde_json::to_string(&from_num).unwrap(), "\"42\"");
  }

  #[test]
  fn ticket_reads_channel_as_source() {
    let ticket: Ticket = serde_json::from_str(
      r#"{
        "ticket_id": "6f1c2b1e-8d4a-4c1e-9f3a-2b7d5e6a9c01",
        "subject": "printer",
        "priority": "high",
        "channel": "portal",
        "created_at": "2024-03-04T10:00:00Z"
      }"#,
    )
    .unwrap();
    assert_eq!(ticket.source.as_deref(), Some("portal"));
  }
}
