//! The tracking of registry items, their requests and the registry counters.
//!
//! Every handler performs all of its lookups and chain reads before its first write, so a
//! missing reference never leaves a half applied event behind. Writes go dependents first and
//! the registry last.

use crate::protocol::chain::{ChainReader, ItemInfo};
use crate::protocol::content::{parse_item_props, ContentFetcher, ContentStatus};
use crate::protocol::error::Error;
use crate::protocol::storage::{Entities, EntityKind, EntityStore, ScalarKey};
use crate::protocol::tcr::storage::{Arbitrator, Evidence, EvidenceGroup, Item, Registry, Request};
use crate::protocol::tcr::types::{
  DisputeOutcome, EvidenceGroupKey, ExtendedStatus, ItemKey, ItemStatus, RequestType,
};
use crate::protocol::tcr::Error as TcrError;
use crate::protocol::{EventMeta, Result};
use alloy_primitives::{Address, B256, U256};

pub struct Tracker<'a> {
  store: &'a dyn EntityStore,
  chain: &'a dyn ChainReader,
  content: &'a dyn ContentFetcher,
}

impl<'a> Tracker<'a> {
  pub fn new(
    store: &'a dyn EntityStore,
    chain: &'a dyn ChainReader,
    content: &'a dyn ContentFetcher,
  ) -> Self {
    Self {
      store,
      chain,
      content,
    }
  }
}

impl<'a> Tracker<'a> {
  pub(crate) fn registry_created(&self, meta: &EventMeta, address: Address) -> Result<()> {
    if self.store.get::<Registry>(&ScalarKey(address))?.is_some() {
      return Err(TcrError::DuplicatedRegistry(address.to_string()).into());
    }

    self
      .store
      .put(&Registry::new(address, meta.block_timestamp))?;

    log::info!("new registry: {address}");

    Ok(())
  }

  /// Items are created here for every addition, direct or not. Accounting happens when the
  /// first request is submitted or when a direct addition changes the status.
  pub(crate) fn new_item(&self, meta: &EventMeta, item_id: B256, data: &str) -> Result<()> {
    let key = ItemKey::new(meta.contract, item_id);
    self.require_registry(meta.contract)?;

    if self.store.get::<Item>(&key)?.is_some() {
      return Err(TcrError::DuplicatedItem(key).into());
    }

    let (status, _) = self.chain_status(meta, &key)?;
    let mut item = Item::new(key, data.to_string(), status);
    self.attach_content(&mut item);
    self.store.put(&item)?;

    log::info!("new item {key} with status {status:?}");

    Ok(())
  }

  pub(crate) fn request_submitted(
    &self,
    meta: &EventMeta,
    item_id: B256,
    evidence_group_id: U256,
  ) -> Result<()> {
    let key = ItemKey::new(meta.contract, item_id);
    let mut registry = self.require_registry(meta.contract)?;
    let mut item = self.require_item(&key)?;
    let (status, info) = self.chain_status(meta, &key)?;
    let params = self
      .chain
      .arbitration_params(meta.block_number, meta.contract)?;

    // computed before the item changes, `None` for an item never accounted
    let previous = item.accounted_status();
    let prior_status = item.status;

    let index = item.number_of_requests;
    item.number_of_requests += 1;
    if info.request_count != item.number_of_requests {
      log::warn!(
        "item {key} has {} requests on chain but {} indexed",
        info.request_count,
        item.number_of_requests
      );
    }

    item.status = status;
    item.disputed = false;
    item.latest_requester = meta.tx_from;
    item.latest_challenger = Address::ZERO;
    item.latest_request_submission_time = meta.block_timestamp;
    item.latest_request_resolution_time = 0;

    Self::update_counters(&mut registry, previous, item.extended_status())?;
    item.accounted = true;

    let request_type = RequestType::from_status(status).unwrap_or_else(|| {
      log::warn!("item {key} is {status:?} right after a request, inferring the request type");
      if prior_status == ItemStatus::Registered {
        RequestType::Clearing
      } else {
        RequestType::Registration
      }
    });

    let request = Request {
      key: key.request(index),
      request_type,
      requester: meta.tx_from,
      challenger: None,
      disputed: false,
      dispute_id: None,
      resolved: false,
      dispute_outcome: DisputeOutcome::None,
      submission_time: meta.block_timestamp,
      resolution_time: None,
      arbitrator: params.arbitrator,
      arbitrator_extra_data: params.extra_data,
      arbitration_params_index: params.index,
      number_of_evidence: 0,
      evidence_group_id,
      creation_tx: meta.tx_hash,
      resolution_tx: None,
    };
    let group = EvidenceGroup {
      key: EvidenceGroupKey {
        registry: meta.contract,
        group_id: evidence_group_id,
      },
      request: request.key,
    };

    self.store.put(&request)?;
    self.store.put(&group)?;
    self.store.put(&item)?;
    self.store.put(&registry)?;

    log::info!("{request_type:?} request {} submitted", request.key);

    Ok(())
  }

  pub(crate) fn request_challenged(
    &self,
    meta: &EventMeta,
    arbitrator: Address,
    dispute_id: U256,
  ) -> Result<()> {
    let mut registry = self.require_registry(meta.contract)?;
    let Some(mut item) = self.disputed_item(meta, arbitrator, dispute_id)? else {
      return Ok(());
    };
    let request_key = item.latest_request().ok_or(TcrError::NoRequest(item.key))?;
    let mut request = self.store.require::<Request>(&request_key)?;

    let previous = item.accounted_status();
    item.disputed = true;
    item.latest_challenger = meta.tx_from;
    Self::update_counters(&mut registry, previous, item.extended_status())?;
    item.accounted = true;

    request.disputed = true;
    request.challenger = Some(meta.tx_from);
    request.dispute_id = Some(dispute_id);

    self.store.put(&request)?;
    self.store.put(&item)?;
    self.store.put(&registry)?;

    log::info!("request {request_key} challenged, dispute {dispute_id}");

    Ok(())
  }

  /// Handles transitions to absent and registered, either resolving the latest request or
  /// applying a direct addition or removal.
  pub(crate) fn status_updated(
    &self,
    meta: &EventMeta,
    item_id: B256,
    updated_directly: bool,
  ) -> Result<()> {
    let key = ItemKey::new(meta.contract, item_id);
    let mut registry = self.require_registry(meta.contract)?;
    let mut item = self.require_item(&key)?;

    let (status, _) = self.chain_status(meta, &key)?;
    if status.is_requested() {
      // emitted alongside a new request, handled by `request_submitted`
      log::debug!("item {key} still {status:?}, nothing to resolve");
      return Ok(());
    }

    let previous = item.accounted_status();
    item.status = status;
    item.disputed = false;
    Self::update_counters(&mut registry, previous, item.extended_status())?;
    item.accounted = true;

    if updated_directly {
      // direct additions and removals involve no request
      self.store.put(&item)?;
      self.store.put(&registry)?;
      log::info!("item {key} directly set to {status:?}");
      return Ok(());
    }

    let request_key = item.latest_request().ok_or(TcrError::NoRequest(key))?;
    let mut request = self.store.require::<Request>(&request_key)?;

    if request.resolved {
      log::warn!("{}, keeping its resolution", TcrError::AlreadyResolved(request_key));
    } else {
      let info = self
        .chain
        .request_info(meta.block_number, meta.contract, item_id, request_key.index)?;
      let outcome = DisputeOutcome::from_ruling(info.ruling);
      if outcome == DisputeOutcome::Error {
        log::error!(
          "registry {} reported unknown ruling {} for request {request_key}",
          meta.contract,
          info.ruling
        );
      }

      request.resolved = true;
      request.resolution_time = Some(meta.block_timestamp);
      request.resolution_tx = Some(meta.tx_hash);
      request.dispute_outcome = outcome;
      item.latest_request_resolution_time = meta.block_timestamp;
    }

    self.store.put(&request)?;
    self.store.put(&item)?;
    self.store.put(&registry)?;

    log::info!(
      "request {request_key} resolved with {:?}, item now {status:?}",
      request.dispute_outcome
    );

    Ok(())
  }

  /// Evidence numbers start at zero for every request
  pub(crate) fn evidence_submitted(
    &self,
    meta: &EventMeta,
    arbitrator: Address,
    evidence_group_id: U256,
    party: Address,
    uri: &str,
  ) -> Result<()> {
    let group_key = EvidenceGroupKey {
      registry: meta.contract,
      group_id: evidence_group_id,
    };
    let group = self.store.require::<EvidenceGroup>(&group_key)?;
    let mut request = self.store.require::<Request>(&group.request)?;

    let number = request.number_of_evidence;
    request.number_of_evidence += 1;
    // the request goes first: a number is never handed out twice
    self.store.put(&request)?;

    let evidence = Evidence {
      key: request.key.evidence(number),
      number,
      uri: uri.to_string(),
      party,
      arbitrator,
      timestamp: meta.block_timestamp,
      tx: meta.tx_hash,
    };
    self.store.put(&evidence)?;

    log::debug!("evidence {number} on request {}", request.key);

    Ok(())
  }

  /// Even meta evidence ids are registration documents, odd ones clearing documents
  pub(crate) fn meta_evidence(
    &self,
    meta: &EventMeta,
    meta_evidence_id: U256,
    uri: &str,
  ) -> Result<()> {
    let mut registry = self.require_registry(meta.contract)?;

    registry.meta_evidence_count += 1;
    if meta_evidence_id.bit(0) {
      registry.clearing_meta_evidence = Some(uri.to_string());
    } else {
      registry.registration_meta_evidence = Some(uri.to_string());
    }

    // the first meta evidence is emitted by the constructor
    let arbitrator = if registry.meta_evidence_count == 1 {
      let params = self
        .chain
        .arbitration_params(meta.block_number, meta.contract)?;
      match self.store.get::<Arbitrator>(&ScalarKey(params.arbitrator))? {
        Some(_) => None,
        None => Some(Arbitrator {
          address: params.arbitrator,
          first_seen_registry: meta.contract,
        }),
      }
    } else {
      None
    };

    if let Some(arbitrator) = arbitrator {
      self.store.put(&arbitrator)?;
      log::info!("new arbitrator: {}", arbitrator.address);
    }
    self.store.put(&registry)?;

    Ok(())
  }

  /// Keeps the time of the ruling. The ruling itself is only logged, the outcome stored on
  /// the request is read from the chain on resolution.
  pub(crate) fn ruling(
    &self,
    meta: &EventMeta,
    arbitrator: Address,
    dispute_id: U256,
    ruling: U256,
  ) -> Result<()> {
    let Some(item) = self.disputed_item(meta, arbitrator, dispute_id)? else {
      return Ok(());
    };
    let request_key = item.latest_request().ok_or(TcrError::NoRequest(item.key))?;
    let mut request = self.store.require::<Request>(&request_key)?;

    request.resolution_time = Some(meta.block_timestamp);
    self.store.put(&request)?;

    log::debug!("arbitrator {arbitrator} ruled {ruling} on request {request_key}");

    Ok(())
  }

  /// The only place registry counters change
  pub fn update_counters(
    registry: &mut Registry,
    previous: Option<ExtendedStatus>,
    new: ExtendedStatus,
  ) -> std::result::Result<(), TcrError> {
    registry.counters.transition(previous, new)?;

    log::debug!(
      "registry {} counters {previous:?} -> {new}: {:?}",
      registry.address,
      registry.counters
    );

    Ok(())
  }
}

impl<'a> Tracker<'a> {
  fn require_registry(&self, address: Address) -> Result<Registry> {
    self.store.require::<Registry>(&ScalarKey(address))
  }

  /// Events of items this index never saw are skipped before anything is read from the chain
  fn require_item(&self, key: &ItemKey) -> Result<Item> {
    match self.store.get::<Item>(key)? {
      Some(item) => Ok(item),
      None => {
        log::warn!(
          "item {} of registry {} not found, ignore",
          key.item_id,
          key.registry
        );
        Err(Error::missing(EntityKind::Item, key))
      }
    }
  }

  fn chain_status(&self, meta: &EventMeta, key: &ItemKey) -> Result<(ItemStatus, ItemInfo)> {
    let info = self
      .chain
      .item_info(meta.block_number, key.registry, key.item_id)?;
    let status = ItemStatus::from_code(info.status)
      .ok_or_else(|| Error::unexpected("item status", info.status.into(), key))?;
    Ok((status, info))
  }

  /// The item a dispute was raised for. Disputes of items this index never saw are skipped.
  fn disputed_item(
    &self,
    meta: &EventMeta,
    arbitrator: Address,
    dispute_id: U256,
  ) -> Result<Option<Item>> {
    let item_id =
      match self
        .chain
        .dispute_to_item(meta.block_number, meta.contract, arbitrator, dispute_id)?
      {
        Some(item_id) => item_id,
        None => {
          let e = TcrError::UnknownDispute {
            registry: meta.contract.to_string(),
            arbitrator: arbitrator.to_string(),
            dispute_id: dispute_id.to_string(),
          };
          log::warn!("{e}, ignore");
          return Ok(None);
        }
      };

    let key = ItemKey::new(meta.contract, item_id);
    let item = self.store.get::<Item>(&key)?;
    if item.is_none() {
      log::warn!("item {key} of dispute {dispute_id} not found, ignore");
    }
    Ok(item)
  }

  fn attach_content(&self, item: &mut Item) {
    let data = match self.content.fetch(&item.data) {
      Ok(data) => data,
      Err(e) => {
        log::error!("failed to fetch item {} content: {e}", item.key);
        item.content = ContentStatus::Unavailable;
        return;
      }
    };

    match parse_item_props(&data) {
      Ok(props) => {
        item.props = props;
        item.content = ContentStatus::Fetched;
      }
      Err(e) => {
        log::error!("item {} content {} is malformed: {e}", item.key, item.data);
        item.content = ContentStatus::Malformed;
      }
    }
  }
}
