//! The entities of the registry lifecycle

use crate::protocol::content::{ContentStatus, ItemProp};
use crate::protocol::storage::{Entity, EntityKind, ScalarKey};
use crate::protocol::tcr::counters::StatusCounters;
use crate::protocol::tcr::types::{
  DisputeOutcome, EvidenceGroupKey, EvidenceKey, ExtendedStatus, ItemKey, ItemStatus, RequestKey,
  RequestType,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
  pub address: Address,
  pub counters: StatusCounters,
  pub meta_evidence_count: u64,
  pub registration_meta_evidence: Option<String>,
  pub clearing_meta_evidence: Option<String>,
  pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
  pub key: ItemKey,
  /// The uri the item was submitted with
  pub data: String,
  pub status: ItemStatus,
  pub disputed: bool,
  pub number_of_requests: u64,
  pub latest_requester: Address,
  pub latest_challenger: Address,
  pub latest_request_submission_time: u64,
  pub latest_request_resolution_time: u64,
  /// Whether the item is included in the registry counters
  pub accounted: bool,
  pub content: ContentStatus,
  pub props: Vec<ItemProp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
  pub key: RequestKey,
  pub request_type: RequestType,
  pub requester: Address,
  pub challenger: Option<Address>,
  pub disputed: bool,
  pub dispute_id: Option<U256>,
  pub resolved: bool,
  pub dispute_outcome: DisputeOutcome,
  pub submission_time: u64,
  pub resolution_time: Option<u64>,
  pub arbitrator: Address,
  pub arbitrator_extra_data: Bytes,
  pub arbitration_params_index: u64,
  pub number_of_evidence: u64,
  pub evidence_group_id: U256,
  pub creation_tx: B256,
  pub resolution_tx: Option<B256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
  pub key: EvidenceKey,
  pub number: u64,
  pub uri: String,
  pub party: Address,
  pub arbitrator: Address,
  pub timestamp: u64,
  pub tx: B256,
}

/// Routes evidence, which only names its group, to the request that opened the group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceGroup {
  pub key: EvidenceGroupKey,
  pub request: RequestKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arbitrator {
  pub address: Address,
  pub first_seen_registry: Address,
}

impl Registry {
  pub fn new(address: Address, created_at: u64) -> Self {
    Self {
      address,
      counters: StatusCounters::default(),
      meta_evidence_count: 0,
      registration_meta_evidence: None,
      clearing_meta_evidence: None,
      created_at,
    }
  }
}

impl Item {
  pub fn new(key: ItemKey, data: String, status: ItemStatus) -> Self {
    Self {
      key,
      data,
      status,
      disputed: false,
      number_of_requests: 0,
      latest_requester: Address::ZERO,
      latest_challenger: Address::ZERO,
      latest_request_submission_time: 0,
      latest_request_resolution_time: 0,
      accounted: false,
      content: ContentStatus::Pending,
      props: Vec::new(),
    }
  }

  pub fn extended_status(&self) -> ExtendedStatus {
    ExtendedStatus::new(self.status, self.disputed)
  }

  /// The status the registry counters currently hold this item under
  pub fn accounted_status(&self) -> Option<ExtendedStatus> {
    self.accounted.then(|| self.extended_status())
  }

  pub fn latest_request(&self) -> Option<RequestKey> {
    self
      .number_of_requests
      .checked_sub(1)
      .map(|index| self.key.request(index))
  }
}

impl Entity for Registry {
  const KIND: EntityKind = EntityKind::Registry;
  type Key = ScalarKey<Address>;

  fn key(&self) -> Self::Key {
    ScalarKey(self.address)
  }
}

impl Entity for Item {
  const KIND: EntityKind = EntityKind::Item;
  type Key = ItemKey;

  fn key(&self) -> Self::Key {
    self.key
  }
}

impl Entity for Request {
  const KIND: EntityKind = EntityKind::Request;
  type Key = RequestKey;

  fn key(&self) -> Self::Key {
    self.key
  }
}

impl Entity for Evidence {
  const KIND: EntityKind = EntityKind::Evidence;
  type Key = EvidenceKey;

  fn key(&self) -> Self::Key {
    self.key
  }
}

impl Entity for EvidenceGroup {
  const KIND: EntityKind = EntityKind::EvidenceGroup;
  type Key = EvidenceGroupKey;

  fn key(&self) -> Self::Key {
    self.key
  }
}

impl Entity for Arbitrator {
  const KIND: EntityKind = EntityKind::Arbitrator;
  type Key = ScalarKey<Address>;

  fn key(&self) -> Self::Key {
    ScalarKey(self.address)
  }
}
