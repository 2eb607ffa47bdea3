//! Read access to registry contract state as of the block being processed

use crate::protocol::error::Error;
use crate::protocol::Result;
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// The `items(itemID)` view of a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInfo {
  /// Raw status code, see [`crate::protocol::tcr::ItemStatus::from_code`]
  pub status: u8,
  pub request_count: u64,
  pub disputed: bool,
}

/// The `getRequestInfo(itemID, requestIndex)` view of a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
  pub disputed: bool,
  pub resolved: bool,
  /// Raw ruling code, see [`crate::protocol::tcr::DisputeOutcome::from_ruling`]
  pub ruling: u8,
  pub submission_time: u64,
  pub resolution_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrationParams {
  pub arbitrator: Address,
  pub extra_data: Bytes,
  /// Index of the entry in the registry's arbitration params history
  pub index: u64,
}

/// Synchronous reads of registry state. Answers must reflect the state as of `block`;
/// callers never cache them across events.
pub trait ChainReader {
  fn item_info(&self, block: u64, registry: Address, item_id: B256) -> Result<ItemInfo>;

  fn request_info(
    &self,
    block: u64,
    registry: Address,
    item_id: B256,
    request_index: u64,
  ) -> Result<RequestInfo>;

  /// Reverse lookup of the item a dispute was raised for
  fn dispute_to_item(
    &self,
    block: u64,
    registry: Address,
    arbitrator: Address,
    dispute_id: U256,
  ) -> Result<Option<B256>>;

  fn arbitration_params(&self, block: u64, registry: Address) -> Result<ArbitrationParams>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
  pub registry: Address,
  pub item_id: B256,
  pub block: u64,
  #[serde(flatten)]
  pub info: ItemInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
  pub registry: Address,
  pub item_id: B256,
  pub request_index: u64,
  pub block: u64,
  #[serde(flatten)]
  pub info: RequestInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisputeRecord {
  pub registry: Address,
  pub arbitrator: Address,
  pub dispute_id: U256,
  pub item_id: B256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrationRecord {
  pub registry: Address,
  pub block: u64,
  #[serde(flatten)]
  pub params: ArbitrationParams,
}

/// The on-disk form of a [`SnapshotChainReader`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSnapshot {
  pub items: Vec<ItemRecord>,
  pub requests: Vec<RequestRecord>,
  pub disputes: Vec<DisputeRecord>,
  pub arbitration: Vec<ArbitrationRecord>,
}

/// Answers reads from recorded contract state. Each record is valid from its block onward,
/// until a later record for the same key replaces it.
#[derive(Debug, Default)]
pub struct SnapshotChainReader {
  items: HashMap<(Address, B256), BTreeMap<u64, ItemInfo>>,
  requests: HashMap<(Address, B256, u64), BTreeMap<u64, RequestInfo>>,
  disputes: HashMap<(Address, Address, U256), B256>,
  arbitration: HashMap<Address, BTreeMap<u64, ArbitrationParams>>,
}

impl SnapshotChainReader {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, SnapshotError> {
    let data = fs::read(path)?;
    let snapshot: ChainSnapshot = serde_json::from_slice(&data)?;
    Ok(Self::from(snapshot))
  }

  pub fn record_item(&mut self, block: u64, registry: Address, item_id: B256, info: ItemInfo) {
    self
      .items
      .entry((registry, item_id))
      .or_default()
      .insert(block, info);
  }

  pub fn record_request(
    &mut self,
    block: u64,
    registry: Address,
    item_id: B256,
    request_index: u64,
    info: RequestInfo,
  ) {
    self
      .requests
      .entry((registry, item_id, request_index))
      .or_default()
      .insert(block, info);
  }

  pub fn record_dispute(
    &mut self,
    registry: Address,
    arbitrator: Address,
    dispute_id: U256,
    item_id: B256,
  ) {
    self
      .disputes
      .insert((registry, arbitrator, dispute_id), item_id);
  }

  pub fn record_arbitration(&mut self, block: u64, registry: Address, params: ArbitrationParams) {
    self
      .arbitration
      .entry(registry)
      .or_default()
      .insert(block, params);
  }
}

fn as_of<T: Clone>(history: Option<&BTreeMap<u64, T>>, block: u64) -> Option<T> {
  history?
    .range(..=block)
    .next_back()
    .map(|(_, value)| value.clone())
}

impl ChainReader for SnapshotChainReader {
  fn item_info(&self, block: u64, registry: Address, item_id: B256) -> Result<ItemInfo> {
    as_of(self.items.get(&(registry, item_id)), block).ok_or_else(|| {
      Error::chain(format!(
        "no item state for {item_id}@{registry} at block {block}"
      ))
    })
  }

  fn request_info(
    &self,
    block: u64,
    registry: Address,
    item_id: B256,
    request_index: u64,
  ) -> Result<RequestInfo> {
    as_of(
      self.requests.get(&(registry, item_id, request_index)),
      block,
    )
    .ok_or_else(|| {
      Error::chain(format!(
        "no request state for {item_id}@{registry}-{request_index} at block {block}"
      ))
    })
  }

  fn dispute_to_item(
    &self,
    _block: u64,
    registry: Address,
    arbitrator: Address,
    dispute_id: U256,
  ) -> Result<Option<B256>> {
    Ok(
      self
        .disputes
        .get(&(registry, arbitrator, dispute_id))
        .copied(),
    )
  }

  fn arbitration_params(&self, block: u64, registry: Address) -> Result<ArbitrationParams> {
    as_of(self.arbitration.get(&registry), block).ok_or_else(|| {
      Error::chain(format!(
        "no arbitration params for {registry} at block {block}"
      ))
    })
  }
}

impl From<ChainSnapshot> for SnapshotChainReader {
  fn from(snapshot: ChainSnapshot) -> Self {
    let mut reader = Self::new();
    for r in snapshot.items {
      reader.record_item(r.block, r.registry, r.item_id, r.info);
    }
    for r in snapshot.requests {
      reader.record_request(r.block, r.registry, r.item_id, r.request_index, r.info);
    }
    for r in snapshot.disputes {
      reader.record_dispute(r.registry, r.arbitrator, r.dispute_id, r.item_id);
    }
    for r in snapshot.arbitration {
      reader.record_arbitration(r.block, r.registry, r.params);
    }
    reader
  }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
  #[error("Cannot read chain snapshot: {0}")]
  Io(#[from] std::io::Error),
  #[error("Invalid chain snapshot: {0}")]
  Json(#[from] serde_json::Error),
}
