//! The badge event handler. Badges are backed by registry items, whose lifecycle is mirrored
//! onto the badge status and the curation statistics.

mod error;
mod tracker;
mod types;

pub use crate::protocol::badge::error::Error;
pub use crate::protocol::badge::tracker::{Mint, Ownership, Tracker};
use crate::protocol::chain::ChainReader;
use crate::protocol::storage::EntityStore;
use crate::protocol::tcr::ItemKey;
use crate::protocol::Result;
use crate::protocol::{EventHandler, EventKind, LogEvent};
pub use types::*;

pub struct BadgeProjector<'a> {
  pub(crate) tracker: Tracker<'a>,
}

impl<'a> BadgeProjector<'a> {
  pub fn new(store: &'a dyn EntityStore, chain: &'a dyn ChainReader) -> Self {
    Self {
      tracker: Tracker::new(store, chain),
    }
  }
}

impl<'a> EventHandler for BadgeProjector<'a> {
  fn handle(&self, event: &LogEvent) -> Result<()> {
    let meta = &event.meta;
    match &event.kind {
      EventKind::KlerosBadgeMinted {
        badge_id,
        registry,
        item_id,
        evidence,
      } => self.tracker.badge_minted(
        meta,
        Mint {
          backend: Backend::Kleros,
          badge_id: *badge_id,
          registry: *registry,
          item_id: *item_id,
          evidence: Some(evidence.as_str()),
        },
      ),
      EventKind::ThirdPartyBadgeMinted {
        badge_id,
        registry,
        item_id,
      } => self.tracker.badge_minted(
        meta,
        Mint {
          backend: Backend::ThirdParty,
          badge_id: *badge_id,
          registry: *registry,
          item_id: *item_id,
          evidence: None,
        },
      ),
      EventKind::BadgeRequested {
        badge_id,
        badge_model_id,
        recipient,
        valid_until,
        uri,
      } => self.tracker.badge_requested(
        meta,
        *badge_id,
        *badge_model_id,
        *recipient,
        *valid_until,
        uri,
      ),
      EventKind::BadgeClaimed {
        badge_id,
        destination,
        valid_until,
      } => self
        .tracker
        .badge_claimed(meta, *badge_id, *destination, *valid_until),
      EventKind::RequestSubmitted { item_id, .. } => {
        match self.tracker.classify(&ItemKey::new(meta.contract, *item_id))? {
          Ownership::Badge(link) => self.tracker.item_requested(meta, &link),
          Ownership::Unrelated => Ok(()),
        }
      }
      EventKind::Dispute {
        arbitrator,
        dispute_id,
        ..
      } => {
        let Some(item) = self
          .tracker
          .disputed_item(meta, *arbitrator, *dispute_id)?
        else {
          return Ok(());
        };
        match self.tracker.classify(&item)? {
          Ownership::Badge(link) => self.tracker.item_challenged(meta, &link),
          Ownership::Unrelated => Ok(()),
        }
      }
      EventKind::ItemStatusChange {
        item_id,
        updated_directly,
      } => match self.tracker.classify(&ItemKey::new(meta.contract, *item_id))? {
        Ownership::Badge(link) => self
          .tracker
          .item_status_changed(meta, &link, *updated_directly),
        Ownership::Unrelated => Ok(()),
      },
      _ => Ok(()),
    }
  }
}
