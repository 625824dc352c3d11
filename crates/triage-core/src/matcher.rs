//! Policy matching: does a policy's filter accept a ticket?

use crate::{
  policy::{PolicyFilter, SlaPolicy},
  ticket::Ticket,
};

/// Whether `policy` applies to `ticket`. Deleted policies never match.
pub fn matches(ticket: &Ticket, policy: &SlaPolicy) -> bool {
  !policy.is_deleted && policy.filter.matches(ticket)
}

impl PolicyFilter {
  /// `true` when no criterion is set.
  pub fn is_catch_all(&self) -> bool {
    self.priority.is_none()
      && self.group_id.is_none()
      && self.ticket_type.is_none()
      && self.source.is_none()
  }

  /// Conjunction of every present criterion. Values compare exactly and
  /// case-sensitively; group ids compare in string form.
  pub fn matches(&self, ticket: &Ticket) -> bool {
    criterion(self.priority.as_ref(), Some(&ticket.priority))
      && criterion(self.group_id.as_ref(), ticket.group_id.as_ref())
      && criterion(self.ticket_type.as_deref(), ticket.ticket_type.as_deref())
      && criterion(self.source.as_deref(), ticket.source.as_deref())
  }
}

/// An absent criterion is vacuously satisfied; a present one requires the
/// ticket to carry an equal value.
fn criterion<T: PartialEq + ?Sized>(
  expected: Option<&T>,
  actual: Option<&T>,
) -> bool {
  match expected {
    None => true,
    Some(expected) => actual == Some(expected),
  }
}
