//! SLA evaluation: pick the first matching policy and compute due timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  calendar::{BusinessCalendar, WallClock},
  matcher,
  policy::{SlaPolicy, TargetKind},
  store::PolicyStore,
  ticket::Ticket,
};

/// The outcome of evaluating a ticket against the policy list.
///
/// "No policy matched" and "policy matched but has no target for this
/// priority" are ordinary outcomes, told apart by which fields are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaComputation {
  pub policy_id:       Option<Uuid>,
  pub response_due_at: Option<DateTime<Utc>>,
  pub resolve_due_at:  Option<DateTime<Utc>>,
}

impl SlaComputation {
  pub fn is_unmatched(&self) -> bool { self.policy_id.is_none() }

  pub fn due_at(&self, target: TargetKind) -> Option<DateTime<Utc>> {
    match target {
      TargetKind::FirstReplyTime => self.response_due_at,
      TargetKind::ResolutionTime => self.resolve_due_at,
    }
  }
}

/// Evaluate `ticket` against `policies`, which must already be in evaluation
/// order. Pure; no I/O.
pub fn evaluate<C: BusinessCalendar>(
  policies: &[SlaPolicy],
  ticket: &Ticket,
  reference: DateTime<Utc>,
  calendar: &C,
) -> SlaComputation {
  let Some(policy) = policies.iter().find(|p| matcher::matches(ticket, p))
  else {
    tracing::trace!(ticket_id = %ticket.ticket_id, "no sla policy matched");
    return SlaComputation::default();
  };

  tracing::trace!(
    ticket_id = %ticket.ticket_id,
    policy_id = %policy.policy_id,
    position = policy.position,
    "sla policy matched"
  );

  let due = |target| {
    policy
      .metric_for(ticket.priority, target)
      .map(|m| calendar.add_minutes(reference, m.minutes))
  };

  SlaComputation {
    policy_id:       Some(policy.policy_id),
    response_due_at: due(TargetKind::FirstReplyTime),
    resolve_due_at:  due(TargetKind::ResolutionTime),
  }
}

// ─── Evaluator ───────────────────────────────────────────────────────────────

/// Computes SLA due timestamps for tickets from the policies in a store.
///
/// Stateless and read-only: safe to call at ticket creation and again on any
/// recompute trigger such as a priority or group change.
#[derive(Debug, Clone)]
pub struct SlaEvaluator<S, C = WallClock> {
  store:    S,
  calendar: C,
}

impl<S: PolicyStore> SlaEvaluator<S> {
  pub fn new(store: S) -> Self { Self { store, calendar: WallClock } }
}

impl<S: PolicyStore, C: BusinessCalendar> SlaEvaluator<S, C> {
  pub fn with_calendar(store: S, calendar: C) -> Self {
    Self { store, calendar }
  }

  pub fn store(&self) -> &S { &self.store }

  /// Evaluate `ticket` against the store's non-deleted policies, with due
  /// timestamps counted from `reference`.
  pub async fn compute(
    &self,
    ticket: &Ticket,
    reference: DateTime<Utc>,
  ) -> Result<SlaComputation, S::Error> {
    let policies = self.store.list(false).await?;
    Ok(evaluate(&policies, ticket, reference, &self.calendar))
  }

  /// [`Self::compute`] with the reference time set to now.
  pub async fn compute_now(
    &self,
    ticket: &Ticket,
  ) -> Result<SlaComputation, S::Error> {
    self.compute(ticket, Utc::now()).await
  }
}
