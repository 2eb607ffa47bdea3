//! The light curated registry event handler

mod counters;
mod error;
mod storage;
mod tracker;
mod types;

pub use crate::protocol::tcr::counters::StatusCounters;
pub use crate::protocol::tcr::error::Error;
pub use crate::protocol::tcr::tracker::Tracker;
use crate::protocol::chain::ChainReader;
use crate::protocol::content::ContentFetcher;
use crate::protocol::storage::EntityStore;
use crate::protocol::Result;
use crate::protocol::{EventHandler, EventKind, LogEvent};
pub use storage::*;
pub use types::*;

/// Keeps registries, items, requests and evidence in sync with the registry events
pub struct LifecycleEngine<'a> {
  pub(crate) tracker: Tracker<'a>,
}

impl<'a> LifecycleEngine<'a> {
  pub fn new(
    store: &'a dyn EntityStore,
    chain: &'a dyn ChainReader,
    content: &'a dyn ContentFetcher,
  ) -> Self {
    Self {
      tracker: Tracker::new(store, chain, content),
    }
  }
}

impl<'a> EventHandler for LifecycleEngine<'a> {
  fn handle(&self, event: &LogEvent) -> Result<()> {
    let meta = &event.meta;
    match &event.kind {
      EventKind::RegistryCreated { registry } => self.tracker.registry_created(meta, *registry),
      EventKind::NewItem { item_id, data } => self.tracker.new_item(meta, *item_id, data),
      EventKind::RequestSubmitted {
        item_id,
        evidence_group_id,
      } => self
        .tracker
        .request_submitted(meta, *item_id, *evidence_group_id),
      EventKind::Dispute {
        arbitrator,
        dispute_id,
        ..
      } => self
        .tracker
        .request_challenged(meta, *arbitrator, *dispute_id),
      EventKind::ItemStatusChange {
        item_id,
        updated_directly,
      } => self
        .tracker
        .status_updated(meta, *item_id, *updated_directly),
      EventKind::Evidence {
        arbitrator,
        evidence_group_id,
        party,
        uri,
      } => self
        .tracker
        .evidence_submitted(meta, *arbitrator, *evidence_group_id, *party, uri),
      EventKind::MetaEvidence {
        meta_evidence_id,
        uri,
      } => self.tracker.meta_evidence(meta, *meta_evidence_id, uri),
      EventKind::Ruling {
        arbitrator,
        dispute_id,
        ruling,
      } => self
        .tracker
        .ruling(meta, *arbitrator, *dispute_id, *ruling),
      _ => {
        log::trace!("{} is not a registry event", event.name());
        Ok(())
      }
    }
  }
}
