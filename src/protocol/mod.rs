//! The generic registry event handler

pub mod badge;
pub mod chain;
pub mod content;
pub mod error;
pub mod handler;
pub mod storage;
pub mod tcr;

use crate::protocol::error::Error;
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

/// Where and when a log was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
  /// The contract that emitted the log
  pub contract: Address,
  pub block_number: u64,
  pub block_timestamp: u64,
  pub tx_hash: B256,
  /// The sender of the transaction, not the contract caller
  pub tx_from: Address,
  pub log_index: u64,
}

/// A decoded log together with its position on chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
  pub meta: EventMeta,
  #[serde(flatten)]
  pub kind: EventKind,
}

/// The catalog of events the indexer understands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum EventKind {
  /// Emitted by the registry factory
  RegistryCreated { registry: Address },
  /// Emitted by the registry for every item it learns about, including direct additions
  NewItem { item_id: B256, data: String },
  RequestSubmitted {
    item_id: B256,
    evidence_group_id: U256,
  },
  /// A request was challenged and a dispute was opened on the arbitrator
  Dispute {
    arbitrator: Address,
    dispute_id: U256,
    meta_evidence_id: U256,
    evidence_group_id: U256,
  },
  ItemStatusChange { item_id: B256, updated_directly: bool },
  Evidence {
    arbitrator: Address,
    evidence_group_id: U256,
    party: Address,
    uri: String,
  },
  MetaEvidence { meta_evidence_id: U256, uri: String },
  Ruling {
    arbitrator: Address,
    dispute_id: U256,
    ruling: U256,
  },
  /// Emitted by the kleros badge controller once the registry item backing a badge exists
  KlerosBadgeMinted {
    badge_id: U256,
    registry: Address,
    item_id: B256,
    evidence: String,
  },
  ThirdPartyBadgeMinted {
    badge_id: U256,
    registry: Address,
    item_id: B256,
  },
  BadgeRequested {
    badge_id: U256,
    badge_model_id: U256,
    recipient: Address,
    valid_until: u64,
    uri: String,
  },
  BadgeClaimed {
    badge_id: U256,
    destination: Address,
    valid_until: u64,
  },
}

impl LogEvent {
  pub fn new(meta: EventMeta, kind: EventKind) -> Self {
    Self { meta, kind }
  }

  /// The position used to order events: block first, then log index
  pub fn position(&self) -> (u64, u64) {
    (self.meta.block_number, self.meta.log_index)
  }

  pub fn name(&self) -> &'static str {
    self.kind.name()
  }
}

impl EventKind {
  pub fn name(&self) -> &'static str {
    match self {
      EventKind::RegistryCreated { .. } => "RegistryCreated",
      EventKind::NewItem { .. } => "NewItem",
      EventKind::RequestSubmitted { .. } => "RequestSubmitted",
      EventKind::Dispute { .. } => "Dispute",
      EventKind::ItemStatusChange { .. } => "ItemStatusChange",
      EventKind::Evidence { .. } => "Evidence",
      EventKind::MetaEvidence { .. } => "MetaEvidence",
      EventKind::Ruling { .. } => "Ruling",
      EventKind::KlerosBadgeMinted { .. } => "KlerosBadgeMinted",
      EventKind::ThirdPartyBadgeMinted { .. } => "ThirdPartyBadgeMinted",
      EventKind::BadgeRequested { .. } => "BadgeRequested",
      EventKind::BadgeClaimed { .. } => "BadgeClaimed",
    }
  }
}

pub trait EventHandler {
  /// Called once per event, in chain order
  fn handle(&self, event: &LogEvent) -> Result<()>;
}
