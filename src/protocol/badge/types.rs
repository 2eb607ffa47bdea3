//! Badges and the accounts that hold and curate them

use crate::protocol::storage::{Entity, EntityKind, ScalarKey};
use crate::protocol::tcr::{ItemKey, ItemStatus};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadgeStatus {
  Requested,
  Approved,
  Challenged,
  RequestRemoval,
  Absent,
}

impl BadgeStatus {
  /// A disputed pending request shows as challenged
  pub fn new(status: ItemStatus, disputed: bool) -> Self {
    match (status, disputed) {
      (ItemStatus::Absent, _) => Self::Absent,
      (ItemStatus::Registered, _) => Self::Approved,
      (ItemStatus::RegistrationRequested | ItemStatus::ClearingRequested, true) => Self::Challenged,
      (ItemStatus::RegistrationRequested, false) => Self::Requested,
      (ItemStatus::ClearingRequested, false) => Self::RequestRemoval,
    }
  }

  /// Whether a request on the backing item is still open
  pub fn is_pending(&self) -> bool {
    matches!(
      self,
      Self::Requested | Self::Challenged | Self::RequestRemoval
    )
  }
}

/// The controller that backs a badge with a registry item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
  Kleros,
  ThirdParty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
  pub id: U256,
  pub badge_model_id: U256,
  pub account: Address,
  pub status: BadgeStatus,
  pub valid_until: u64,
  /// The badge contract that minted it
  pub contract: Address,
  pub uri: String,
  pub created_at: u64,
  pub created_tx: B256,
  pub claimed_at: Option<u64>,
  pub claimed_tx: Option<B256>,
}

/// Shares its id with the badge, and may exist before the badge itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeMetadata {
  pub badge_id: U256,
  pub backend: Backend,
  pub registry: Address,
  pub item_id: B256,
  pub tcr_status: BadgeStatus,
  pub evidence: Option<String>,
  /// Index of the last request whose challenge was settled in the statistics
  pub last_settled_request: Option<u64>,
  pub minted_at: u64,
}

/// Marks a registry item as backing a badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeItemLink {
  pub item: ItemKey,
  pub badge_id: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub address: Address,
  pub is_curator: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
  pub address: Address,
  pub minted_badges: u64,
  pub challenges_made: u64,
  pub challenges_received: u64,
  pub challenges_won: u64,
  pub challenges_lost: u64,
  pub last_challenge_received: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolStatistics {
  pub contract: Address,
  pub badges_minted: u64,
  pub badges_challenged: u64,
  pub badge_curators: BTreeSet<Address>,
  pub curators_amount: u64,
}

impl User {
  pub fn new(address: Address) -> Self {
    Self {
      address,
      is_curator: false,
    }
  }
}

impl UserStatistics {
  pub fn new(address: Address) -> Self {
    Self {
      address,
      ..Default::default()
    }
  }
}

impl ProtocolStatistics {
  pub fn new(contract: Address) -> Self {
    Self {
      contract,
      ..Default::default()
    }
  }

  pub fn add_curator(&mut self, curator: Address) {
    self.badge_curators.insert(curator);
    self.curators_amount = self.badge_curators.len() as u64;
  }
}

impl Entity for Badge {
  const KIND: EntityKind = EntityKind::Badge;
  type Key = ScalarKey<U256>;

  fn key(&self) -> Self::Key {
    ScalarKey(self.id)
  }
}

impl Entity for BadgeMetadata {
  const KIND: EntityKind = EntityKind::BadgeMetadata;
  type Key = ScalarKey<U256>;

  fn key(&self) -> Self::Key {
    ScalarKey(self.badge_id)
  }
}

impl Entity for BadgeItemLink {
  const KIND: EntityKind = EntityKind::BadgeItemLink;
  type Key = ItemKey;

  fn key(&self) -> Self::Key {
    self.item
  }
}

impl Entity for User {
  const KIND: EntityKind = EntityKind::User;
  type Key = ScalarKey<Address>;

  fn key(&self) -> Self::Key {
    ScalarKey(self.address)
  }
}

impl Entity for UserStatistics {
  const KIND: EntityKind = EntityKind::UserStatistics;
  type Key = ScalarKey<Address>;

  fn key(&self) -> Self::Key {
    ScalarKey(self.address)
  }
}

impl Entity for ProtocolStatistics {
  const KIND: EntityKind = EntityKind::ProtocolStatistics;
  type Key = ScalarKey<Address>;

  fn key(&self) -> Self::Key {
    ScalarKey(self.contract)
  }
}
