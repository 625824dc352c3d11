//! Deadline monitoring: classify due timestamps and raise SLA alerts.
//!
//! A scheduler outside this crate periodically hands each open ticket, its
//! matched policy and its stored [`SlaComputation`] to [`SlaMonitor`]. The
//! monitor decides whether a warning or breach alert is due; delivering it is
//! the job of an [`AlertSink`].

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  evaluator::SlaComputation,
  policy::{SlaPolicy, TargetKind},
  ticket::{Priority, Ticket},
};

// ─── Classification ──────────────────────────────────────────────────────────

/// Where a single deadline stands relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeadlineState {
  OnTrack,
  /// Inside the warning window; `minutes_remaining` is never negative.
  Warning { minutes_remaining: i64 },
  /// At or past the deadline.
  Breached { minutes_overdue: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
  Warning,
  Breach,
}

/// Event payload handed to the notification pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaAlert {
  pub kind:              AlertKind,
  pub target:            TargetKind,
  pub ticket_id:         Uuid,
  pub subject:           String,
  pub priority:          Priority,
  pub policy_id:         Uuid,
  pub policy_title:      String,
  /// Negative once the deadline has passed.
  pub minutes_remaining: i64,
  pub assignee_email:    Option<String>,
  pub due_at:            DateTime<Utc>,
}

// ─── Monitor ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct SlaMonitor {
  warn_before: Duration,
}

impl Default for SlaMonitor {
  fn default() -> Self { Self::new(Duration::minutes(30)) }
}

impl SlaMonitor {
  pub fn new(warn_before: Duration) -> Self { Self { warn_before } }

  pub fn classify(&self, due_at: DateTime<Utc>, now: DateTime<Utc>) -> DeadlineState {
    let remaining = due_at - now;
    if remaining <= Duration::zero() {
      DeadlineState::Breached { minutes_overdue: -remaining.num_minutes() }
    } else if remaining <= self.warn_before {
      DeadlineState::Warning { minutes_remaining: remaining.num_minutes() }
    } else {
      DeadlineState::OnTrack
    }
  }

  /// Alerts due for `ticket` at `now`. Targets the ticket has already met
  /// (replied, resolved) produce nothing. `policy` must be the policy named
  /// by `computation`; a mismatch yields no alerts.
  pub fn check(
    &self,
    ticket: &Ticket,
    policy: &SlaPolicy,
    computation: &SlaComputation,
    now: DateTime<Utc>,
  ) -> Vec<SlaAlert> {
    if computation.policy_id != Some(policy.policy_id) {
      return Vec::new();
    }

    [
      (TargetKind::FirstReplyTime, ticket.first_replied_at),
      (TargetKind::ResolutionTime, ticket.resolved_at),
    ]
    .into_iter()
    .filter(|(_, met_at)| met_at.is_none())
    .filter_map(|(target, _)| {
      let due_at = computation.due_at(target)?;
      let kind = match self.classify(due_at, now) {
        DeadlineState::OnTrack => return None,
        DeadlineState::Warning { .. } => AlertKind::Warning,
        DeadlineState::Breached { .. } => AlertKind::Breach,
      };
      Some(SlaAlert {
        kind,
        target,
        ticket_id: ticket.ticket_id,
        subject: ticket.subject.clone(),
        priority: ticket.priority,
        policy_id: policy.policy_id,
        policy_title: policy.title.clone(),
        minutes_remaining: (due_at - now).num_minutes(),
        assignee_email: ticket.assignee_email.clone(),
        due_at,
      })
    })
    .collect()
  }

  /// Check `ticket` and hand every resulting alert to `sink`. Returns the
  /// number of alerts published; stops at the first sink error.
  pub async fn check_and_publish<K: AlertSink>(
    &self,
    sink: &K,
    ticket: &Ticket,
    policy: &SlaPolicy,
    computation: &SlaComputation,
    now: DateTime<Utc>,
  ) -> Result<usize, K::Error> {
    let alerts = self.check(ticket, policy, computation, now);
    for alert in &alerts {
      sink.publish(alert).await?;
    }
    Ok(alerts.len())
  }
}

// ─── Sinks ───────────────────────────────────────────────────────────────────

/// Destination for SLA alerts (an event stream producer, a mailer, ...).
pub trait AlertSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn publish(
    &self,
    alert: &SlaAlert,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Writes alerts to the `tracing` log and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AlertSink for TracingSink {
  type Error = std::convert::Infallible;

  async fn publish(&self, alert: &SlaAlert) -> Result<(), Self::Error> {
    match alert.kind {
      AlertKind::Warning => tracing::warn!(
        ticket_id = %alert.ticket_id,
        policy = %alert.policy_title,
        target = %alert.target,
        minutes_remaining = alert.minutes_remaining,
        "sla deadline approaching"
      ),
      AlertKind::Breach => tracing::error!(
        ticket_id = %alert.ticket_id,
        policy = %alert.policy_title,
        target = %alert.target,
        minutes_overdue = -alert.minutes_remaining,
        "sla deadline breached"
      ),
    }
    Ok(())
  }
}
