//! The struct that calls all the event handlers.

use crate::protocol::badge::BadgeProjector;
use crate::protocol::error::Error;
use crate::protocol::tcr::LifecycleEngine;
use crate::protocol::Result;
use crate::protocol::{EventHandler, EventKind, LogEvent};
use alloy_primitives::{Address, B256};
use std::collections::{BTreeSet, HashSet};

pub enum Handler<'a> {
  Lifecycle(LifecycleEngine<'a>),
  Badge(BadgeProjector<'a>),
}

impl<'a> EventHandler for Handler<'a> {
  fn handle(&self, event: &LogEvent) -> Result<()> {
    match self {
      Handler::Lifecycle(h) => h.handle(event),
      Handler::Badge(h) => h.handle(event),
    }
  }
}

/// Orders the recorded events and feeds them to every handler
pub struct EventIngestor<'a> {
  /// The list of handlers registered, called in order for every event
  handlers: Vec<Handler<'a>>,
  /// The recorded events, not yet processed
  events: Vec<LogEvent>,
  /// `(tx hash, log index)` of every recorded event
  seen: HashSet<(B256, u64)>,
  /// When set, events of other contracts are dropped
  tracked: Option<BTreeSet<Address>>,
}

impl<'a> EventIngestor<'a> {
  pub fn new(handlers: Vec<Handler<'a>>) -> Self {
    Self {
      handlers,
      events: vec![],
      seen: HashSet::new(),
      tracked: None,
    }
  }

  pub fn with_tracked_contracts(mut self, contracts: impl IntoIterator<Item = Address>) -> Self {
    self.tracked = Some(contracts.into_iter().collect());
    self
  }

  /// Returns whether the event was kept, duplicates are dropped. Untracked contracts are
  /// filtered when processing, once the events are in chain order.
  pub fn record_event(&mut self, event: LogEvent) -> bool {
    if !self.seen.insert((event.meta.tx_hash, event.meta.log_index)) {
      log::debug!(
        "duplicated {} at {}:{}",
        event.name(),
        event.meta.tx_hash,
        event.meta.log_index
      );
      return false;
    }

    self.events.push(event);
    true
  }

  pub fn pending(&self) -> usize {
    self.events.len()
  }

  /// Processes the recorded events in chain order. Stops at the first blocking error, leaving
  /// the unprocessed events recorded.
  pub fn process(&mut self) -> Result<()> {
    self.events.sort_by_key(LogEvent::position);

    let events = std::mem::take(&mut self.events);
    let mut iter = events.into_iter();
    while let Some(event) = iter.next() {
      if !self.track(&event) {
        continue;
      }
      if let Err(e) = self.process_event(&event) {
        self.events.push(event);
        self.events.extend(iter);
        return Err(e);
      }
    }
    Ok(())
  }

  /// Registries created by a tracked factory are tracked from then on
  fn track(&mut self, event: &LogEvent) -> bool {
    let Some(tracked) = &mut self.tracked else {
      return true;
    };
    if !tracked.contains(&event.meta.contract) {
      log::trace!("dropping event of untracked contract {}", event.meta.contract);
      return false;
    }
    if let EventKind::RegistryCreated { registry } = event.kind {
      tracked.insert(registry);
    }
    true
  }

  fn process_event(&self, event: &LogEvent) -> Result<()> {
    log::debug!("processing event: {event:?}");

    for h in self.handlers.iter() {
      match h.handle(event) {
        Ok(_) => {}
        Err(Error::NonBlocking(e)) => {
          log::error!(
            "{} at block {} log {} skipped: {e}",
            event.name(),
            event.meta.block_number,
            event.meta.log_index
          );
        }
        Err(Error::Blocking(e)) => {
          log::error!("blocking error encountered: {e}");
          return Err(Error::Blocking(e));
        }
      }
    }
    Ok(())
  }
}
