//! Tracks how many items of a registry are in each extended status

use crate::protocol::tcr::types::ExtendedStatus;
use crate::protocol::tcr::Error;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounters {
  absent: u64,
  registered: u64,
  registration_requested: u64,
  clearing_requested: u64,
  challenged_registrations: u64,
  challenged_clearing: u64,
}

impl StatusCounters {
  pub fn get(&self, status: ExtendedStatus) -> u64 {
    match status {
      ExtendedStatus::Absent => self.absent,
      ExtendedStatus::Registered => self.registered,
      ExtendedStatus::RegistrationRequested => self.registration_requested,
      ExtendedStatus::ClearingRequested => self.clearing_requested,
      ExtendedStatus::ChallengedRegistration => self.challenged_registrations,
      ExtendedStatus::ChallengedClearing => self.challenged_clearing,
    }
  }

  /// Number of items accounted in the registry
  pub fn total(&self) -> u64 {
    ExtendedStatus::ALL.iter().map(|s| self.get(*s)).sum()
  }

  /// Moves one item from `previous` to `new`. `None` means the item was not accounted yet,
  /// so only `new` is incremented. Nothing changes when an error is returned.
  pub fn transition(
    &mut self,
    previous: Option<ExtendedStatus>,
    new: ExtendedStatus,
  ) -> Result<(), Error> {
    if previous == Some(new) {
      return Ok(());
    }

    let mut next = *self;
    if let Some(previous) = previous {
      let counter = next.counter_mut(previous);
      *counter = counter
        .checked_sub(1)
        .ok_or(Error::CounterUnderflow(previous))?;
    }

    let counter = next.counter_mut(new);
    *counter = counter.checked_add(1).ok_or(Error::CounterOverflow(new))?;

    *self = next;
    Ok(())
  }

  fn counter_mut(&mut self, status: ExtendedStatus) -> &mut u64 {
    match status {
      ExtendedStatus::Absent => &mut self.absent,
      ExtendedStatus::Registered => &mut self.registered,
      ExtendedStatus::RegistrationRequested => &mut self.registration_requested,
      ExtendedStatus::ClearingRequested => &mut self.clearing_requested,
      ExtendedStatus::ChallengedRegistration => &mut self.challenged_registrations,
      ExtendedStatus::ChallengedClearing => &mut self.challenged_clearing,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_first_accounting_only_increments() {
    let mut counters = StatusCounters::default();
    counters
      .transition(None, ExtendedStatus::RegistrationRequested)
      .unwrap();
    assert_eq!(counters.get(ExtendedStatus::RegistrationRequested), 1);
    assert_eq!(counters.total(), 1);
  }

  #[test]
  fn test_transitions_are_paired() {
    let mut counters = StatusCounters::default();
    counters
      .transition(None, ExtendedStatus::RegistrationRequested)
      .unwrap();
    counters
      .transition(
        Some(ExtendedStatus::RegistrationRequested),
        ExtendedStatus::ChallengedRegistration,
      )
      .unwrap();
    counters
      .transition(
        Some(ExtendedStatus::ChallengedRegistration),
        ExtendedStatus::Registered,
      )
      .unwrap();

    assert_eq!(counters.get(ExtendedStatus::Registered), 1);
    assert_eq!(counters.get(ExtendedStatus::RegistrationRequested), 0);
    assert_eq!(counters.get(ExtendedStatus::ChallengedRegistration), 0);
    assert_eq!(counters.total(), 1);
  }

  #[test]
  fn test_same_status_is_a_no_op() {
    let mut counters = StatusCounters::default();
    counters.transition(None, ExtendedStatus::Registered).unwrap();
    counters
      .transition(Some(ExtendedStatus::Registered), ExtendedStatus::Registered)
      .unwrap();
    assert_eq!(counters.get(ExtendedStatus::Registered), 1);
  }

  #[test]
  fn test_underflow_leaves_counters_untouched() {
    let mut counters = StatusCounters::default();
    counters.transition(None, ExtendedStatus::Absent).unwrap();
    let before = counters;

    assert!(matches!(
      counters.transition(Some(ExtendedStatus::Registered), ExtendedStatus::Absent),
      Err(Error::CounterUnderflow(ExtendedStatus::Registered))
    ));
    assert_eq!(counters, before);
  }
}
