//! The basic types for light curated registries

use crate::protocol::storage::{hex_key, StorageKey};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Items on a registry are in one of four contract states:
/// - (0) Absent: not registered and no pending request.
/// - (1) Registered: registered and no pending request.
/// - (2) RegistrationRequested: not registered, with a pending registration request.
/// - (3) ClearingRequested: registered, with a pending removal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
  Absent,
  Registered,
  RegistrationRequested,
  ClearingRequested,
}

impl ItemStatus {
  pub fn from_code(code: u8) -> Option<Self> {
    match code {
      0 => Some(Self::Absent),
      1 => Some(Self::Registered),
      2 => Some(Self::RegistrationRequested),
      3 => Some(Self::ClearingRequested),
      _ => None,
    }
  }

  pub fn code(&self) -> u8 {
    match self {
      Self::Absent => 0,
      Self::Registered => 1,
      Self::RegistrationRequested => 2,
      Self::ClearingRequested => 3,
    }
  }

  /// Whether a request on the item is still pending
  pub fn is_requested(&self) -> bool {
    matches!(self, Self::RegistrationRequested | Self::ClearingRequested)
  }
}

/// The item status combined with its disputed flag. Registry counters are kept per
/// extended status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtendedStatus {
  Absent,
  Registered,
  RegistrationRequested,
  ClearingRequested,
  ChallengedRegistration,
  ChallengedClearing,
}

impl ExtendedStatus {
  pub const ALL: [ExtendedStatus; 6] = [
    Self::Absent,
    Self::Registered,
    Self::RegistrationRequested,
    Self::ClearingRequested,
    Self::ChallengedRegistration,
    Self::ChallengedClearing,
  ];

  /// Only pending requests can be disputed, the flag is ignored on settled items.
  pub fn new(status: ItemStatus, disputed: bool) -> Self {
    match (status, disputed) {
      (ItemStatus::Absent, _) => Self::Absent,
      (ItemStatus::Registered, _) => Self::Registered,
      (ItemStatus::RegistrationRequested, false) => Self::RegistrationRequested,
      (ItemStatus::ClearingRequested, false) => Self::ClearingRequested,
      (ItemStatus::RegistrationRequested, true) => Self::ChallengedRegistration,
      (ItemStatus::ClearingRequested, true) => Self::ChallengedClearing,
    }
  }
}

impl Display for ExtendedStatus {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{self:?}")
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
  Registration,
  Clearing,
}

impl RequestType {
  /// The request type implied by the status an item enters when the request is submitted
  pub fn from_status(status: ItemStatus) -> Option<Self> {
    match status {
      ItemStatus::RegistrationRequested => Some(Self::Registration),
      ItemStatus::ClearingRequested => Some(Self::Clearing),
      _ => None,
    }
  }
}

/// The arbitrator's final ruling on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeOutcome {
  /// No ruling, or the arbitrator refused to rule
  None,
  Accept,
  Reject,
  /// The chain reported a ruling code outside the known set
  Error,
}

impl DisputeOutcome {
  pub fn from_ruling(ruling: u8) -> Self {
    match ruling {
      0 => Self::None,
      1 => Self::Accept,
      2 => Self::Reject,
      _ => Self::Error,
    }
  }

  pub fn ruling(&self) -> Option<u8> {
    match self {
      Self::None => Some(0),
      Self::Accept => Some(1),
      Self::Reject => Some(2),
      Self::Error => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemKey {
  pub registry: Address,
  pub item_id: B256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
  pub item: ItemKey,
  pub index: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceKey {
  pub request: RequestKey,
  pub index: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceGroupKey {
  pub registry: Address,
  pub group_id: U256,
}

impl ItemKey {
  pub fn new(registry: Address, item_id: B256) -> Self {
    Self { registry, item_id }
  }

  pub fn request(&self, index: u64) -> RequestKey {
    RequestKey { item: *self, index }
  }
}

impl RequestKey {
  pub fn evidence(&self, index: u64) -> EvidenceKey {
    EvidenceKey {
      request: *self,
      index,
    }
  }
}

impl StorageKey for ItemKey {
  fn storage_key(&self) -> String {
    format!(
      "{}@{}",
      hex_key(self.item_id.as_slice()),
      hex_key(self.registry.as_slice())
    )
  }
}

impl StorageKey for RequestKey {
  fn storage_key(&self) -> String {
    format!("{}-{}", self.item.storage_key(), self.index)
  }
}

impl StorageKey for EvidenceKey {
  fn storage_key(&self) -> String {
    format!("{}-{}", self.request.storage_key(), self.index)
  }
}

impl StorageKey for EvidenceGroupKey {
  fn storage_key(&self) -> String {
    format!("{}@{}", self.group_id, hex_key(self.registry.as_slice()))
  }
}

impl Display for ItemKey {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.storage_key())
  }
}

impl Display for RequestKey {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.storage_key())
  }
}
