//! Projects the lifecycle of badge backed registry items onto badges, users and statistics.
//!
//! Runs after the registry lifecycle, so the registry entities of the event are already
//! up to date when read here.

use crate::protocol::badge::types::{
  Backend, Badge, BadgeItemLink, BadgeMetadata, BadgeStatus, ProtocolStatistics, User,
  UserStatistics,
};
use crate::protocol::badge::Error as BadgeError;
use crate::protocol::chain::ChainReader;
use crate::protocol::error::Error;
use crate::protocol::storage::{Entities, EntityStore, ScalarKey};
use crate::protocol::tcr::{DisputeOutcome, Item, ItemKey, ItemStatus, Request};
use crate::protocol::{EventMeta, Result};
use alloy_primitives::{Address, B256, U256};

/// Whether a registry item backs a badge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
  Unrelated,
  Badge(BadgeItemLink),
}

/// What a badge mint event says about the item behind it
pub struct Mint<'e> {
  pub backend: Backend,
  pub badge_id: U256,
  pub registry: Address,
  pub item_id: B256,
  pub evidence: Option<&'e str>,
}

pub struct Tracker<'a> {
  store: &'a dyn EntityStore,
  chain: &'a dyn ChainReader,
}

impl<'a> Tracker<'a> {
  pub fn new(store: &'a dyn EntityStore, chain: &'a dyn ChainReader) -> Self {
    Self { store, chain }
  }

  pub fn classify(&self, item: &ItemKey) -> Result<Ownership> {
    Ok(match self.store.get::<BadgeItemLink>(item)? {
      Some(link) => Ownership::Badge(link),
      None => Ownership::Unrelated,
    })
  }

  /// The item a dispute was raised for, if any
  pub fn disputed_item(
    &self,
    meta: &EventMeta,
    arbitrator: Address,
    dispute_id: U256,
  ) -> Result<Option<ItemKey>> {
    Ok(
      self
        .chain
        .dispute_to_item(meta.block_number, meta.contract, arbitrator, dispute_id)?
        .map(|item_id| ItemKey::new(meta.contract, item_id)),
    )
  }
}

impl<'a> Tracker<'a> {
  pub(crate) fn badge_minted(&self, meta: &EventMeta, mint: Mint<'_>) -> Result<()> {
    let key = ScalarKey(mint.badge_id);
    if self.store.get::<BadgeMetadata>(&key)?.is_some() {
      return Err(BadgeError::DuplicatedBadge(mint.badge_id.to_string()).into());
    }

    let item = ItemKey::new(mint.registry, mint.item_id);
    if let Ownership::Badge(link) = self.classify(&item)? {
      log::warn!(
        "item {item} moves from badge {} to badge {}",
        link.badge_id,
        mint.badge_id
      );
    }

    let tcr_status = self.tcr_status(meta, &item)?;
    let metadata = BadgeMetadata {
      badge_id: mint.badge_id,
      backend: mint.backend,
      registry: mint.registry,
      item_id: mint.item_id,
      tcr_status,
      evidence: mint.evidence.map(str::to_string),
      last_settled_request: None,
      minted_at: meta.block_timestamp,
    };
    let link = BadgeItemLink {
      item,
      badge_id: mint.badge_id,
    };

    self.store.put(&metadata)?;
    self.store.put(&link)?;

    log::info!(
      "{:?} badge {} backed by item {item}",
      mint.backend,
      mint.badge_id
    );

    Ok(())
  }

  pub(crate) fn badge_requested(
    &self,
    meta: &EventMeta,
    badge_id: U256,
    badge_model_id: U256,
    recipient: Address,
    valid_until: u64,
    uri: &str,
  ) -> Result<()> {
    let key = ScalarKey(badge_id);
    if self.store.get::<Badge>(&key)?.is_some() {
      return Err(BadgeError::DuplicatedBadge(badge_id.to_string()).into());
    }
    let metadata = self.store.require::<BadgeMetadata>(&key)?;

    let badge = Badge {
      id: badge_id,
      badge_model_id,
      account: recipient,
      status: metadata.tcr_status,
      valid_until,
      contract: meta.contract,
      uri: uri.to_string(),
      created_at: meta.block_timestamp,
      created_tx: meta.tx_hash,
      claimed_at: None,
      claimed_tx: None,
    };

    let mut user_stats = self.user_statistics(recipient)?;
    incr(&mut user_stats.minted_badges, "minted badges")?;
    let mut protocol_stats = self.protocol_statistics(meta.contract)?;
    incr(&mut protocol_stats.badges_minted, "badges minted")?;

    self.ensure_user(recipient)?;
    self.store.put(&badge)?;
    self.store.put(&user_stats)?;
    self.store.put(&protocol_stats)?;

    log::info!("badge {badge_id} requested for {recipient}");

    Ok(())
  }

  pub(crate) fn badge_claimed(
    &self,
    meta: &EventMeta,
    badge_id: U256,
    destination: Address,
    valid_until: u64,
  ) -> Result<()> {
    let mut badge = self.store.require::<Badge>(&ScalarKey(badge_id))?;

    badge.account = destination;
    badge.valid_until = valid_until;
    badge.claimed_at = Some(meta.block_timestamp);
    badge.claimed_tx = Some(meta.tx_hash);

    self.ensure_user(destination)?;
    self.store.put(&badge)?;

    log::info!("badge {badge_id} claimed by {destination}");

    Ok(())
  }

  pub(crate) fn item_requested(&self, meta: &EventMeta, link: &BadgeItemLink) -> Result<()> {
    let status = self.tcr_status(meta, &link.item)?;
    self.set_status(link, status)
  }

  pub(crate) fn item_challenged(&self, meta: &EventMeta, link: &BadgeItemLink) -> Result<()> {
    let curator = meta.tx_from;
    let (metadata, badge) = self.with_status(link, BadgeStatus::Challenged)?;

    let Some(badge) = badge else {
      log::warn!("badge {} challenged before it was requested", link.badge_id);
      self.store.put(&metadata)?;
      return Ok(());
    };

    let mut protocol_stats = self.protocol_statistics(badge.contract)?;
    incr(&mut protocol_stats.badges_challenged, "badges challenged")?;
    protocol_stats.add_curator(curator);

    let mut user = self
      .store
      .get::<User>(&ScalarKey(curator))?
      .unwrap_or_else(|| User::new(curator));
    user.is_curator = true;

    let mut curator_stats = self.user_statistics(curator)?;
    incr(&mut curator_stats.challenges_made, "challenges made")?;
    // a curator challenging their own badge has a single statistics entry
    let mut owner_stats = if badge.account == curator {
      None
    } else {
      Some(self.user_statistics(badge.account)?)
    };
    let owner = owner_stats.as_mut().unwrap_or(&mut curator_stats);
    incr(&mut owner.challenges_received, "challenges received")?;
    owner.last_challenge_received = Some(meta.block_timestamp);

    self.store.put(&metadata)?;
    self.store.put(&badge)?;
    self.store.put(&protocol_stats)?;
    self.store.put(&user)?;
    self.store.put(&curator_stats)?;
    if let Some(owner_stats) = owner_stats {
      self.store.put(&owner_stats)?;
    }

    log::info!("badge {} challenged by {curator}", link.badge_id);

    Ok(())
  }

  pub(crate) fn item_status_changed(
    &self,
    meta: &EventMeta,
    link: &BadgeItemLink,
    updated_directly: bool,
  ) -> Result<()> {
    let status = self.tcr_status(meta, &link.item)?;
    if status.is_pending() {
      return Ok(());
    }

    self.set_status(link, status)?;
    if !updated_directly {
      self.settle(link)?;
    }
    Ok(())
  }
}

impl<'a> Tracker<'a> {
  fn tcr_status(&self, meta: &EventMeta, item: &ItemKey) -> Result<BadgeStatus> {
    let info = self
      .chain
      .item_info(meta.block_number, item.registry, item.item_id)?;
    let status = ItemStatus::from_code(info.status)
      .ok_or_else(|| Error::unexpected("item status", info.status.into(), item))?;
    Ok(BadgeStatus::new(status, info.disputed))
  }

  /// The metadata keeps the status while the badge is not requested yet
  fn set_status(&self, link: &BadgeItemLink, status: BadgeStatus) -> Result<()> {
    let (metadata, badge) = self.with_status(link, status)?;

    self.store.put(&metadata)?;
    if let Some(badge) = badge {
      self.store.put(&badge)?;
    }

    Ok(())
  }

  fn with_status(
    &self,
    link: &BadgeItemLink,
    status: BadgeStatus,
  ) -> Result<(BadgeMetadata, Option<Badge>)> {
    let key = ScalarKey(link.badge_id);
    let mut metadata = self.store.require::<BadgeMetadata>(&key)?;
    let mut badge = self.store.get::<Badge>(&key)?;

    metadata.tcr_status = status;
    if let Some(badge) = badge.as_mut() {
      badge.status = status;
    }

    log::debug!("badge {} is now {status:?}", link.badge_id);

    Ok((metadata, badge))
  }

  /// Credits the winner and loser of the latest request's dispute, once per request
  fn settle(&self, link: &BadgeItemLink) -> Result<()> {
    let key = ScalarKey(link.badge_id);
    let mut metadata = self.store.require::<BadgeMetadata>(&key)?;
    let item = self.store.require::<Item>(&link.item)?;
    let Some(request_key) = item.latest_request() else {
      return Ok(());
    };
    let request = self.store.require::<Request>(&request_key)?;

    if !request.resolved || metadata.last_settled_request == Some(request_key.index) {
      return Ok(());
    }
    let (Some(curator), Some(badge)) = (request.challenger, self.store.get::<Badge>(&key)?) else {
      return Ok(());
    };

    let (winner, loser) = match request.dispute_outcome {
      DisputeOutcome::Accept => (badge.account, curator),
      DisputeOutcome::Reject => (curator, badge.account),
      DisputeOutcome::None | DisputeOutcome::Error => {
        log::debug!("no winner for the dispute of request {request_key}");
        metadata.last_settled_request = Some(request_key.index);
        self.store.put(&metadata)?;
        return Ok(());
      }
    };

    let mut winner_stats = self.user_statistics(winner)?;
    incr(&mut winner_stats.challenges_won, "challenges won")?;
    let mut loser_stats = if loser == winner {
      None
    } else {
      Some(self.user_statistics(loser)?)
    };
    incr(
      &mut loser_stats.as_mut().unwrap_or(&mut winner_stats).challenges_lost,
      "challenges lost",
    )?;
    metadata.last_settled_request = Some(request_key.index);

    self.store.put(&winner_stats)?;
    if let Some(loser_stats) = loser_stats {
      self.store.put(&loser_stats)?;
    }
    self.store.put(&metadata)?;

    log::info!("dispute of request {request_key} won by {winner}");

    Ok(())
  }

  fn ensure_user(&self, address: Address) -> Result<()> {
    if self.store.get::<User>(&ScalarKey(address))?.is_none() {
      self.store.put(&User::new(address))?;
    }
    Ok(())
  }

  fn user_statistics(&self, address: Address) -> Result<UserStatistics> {
    Ok(
      self
        .store
        .get::<UserStatistics>(&ScalarKey(address))?
        .unwrap_or_else(|| UserStatistics::new(address)),
    )
  }

  fn protocol_statistics(&self, contract: Address) -> Result<ProtocolStatistics> {
    Ok(
      self
        .store
        .get::<ProtocolStatistics>(&ScalarKey(contract))?
        .unwrap_or_else(|| ProtocolStatistics::new(contract)),
    )
  }
}

fn incr(value: &mut u64, name: &'static str) -> std::result::Result<(), BadgeError> {
  *value = value
    .checked_add(1)
    .ok_or(BadgeError::StatisticOverflow(name))?;
  Ok(())
}
