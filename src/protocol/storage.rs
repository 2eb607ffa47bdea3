//! Storage related functions

use crate::protocol::Result;
use redb::{Database, ReadableTable, TableDefinition, TableError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::path::Path;

/// Every kind of entity the indexer persists, one table each
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
  Registry,
  Item,
  Request,
  Evidence,
  EvidenceGroup,
  Arbitrator,
  Badge,
  BadgeMetadata,
  BadgeItemLink,
  User,
  UserStatistics,
  ProtocolStatistics,
}

impl EntityKind {
  pub fn table_name(&self) -> &'static str {
    match self {
      EntityKind::Registry => "TCR_REGISTRY",
      EntityKind::Item => "TCR_ITEM",
      EntityKind::Request => "TCR_REQUEST",
      EntityKind::Evidence => "TCR_EVIDENCE",
      EntityKind::EvidenceGroup => "TCR_EVIDENCE_GROUP",
      EntityKind::Arbitrator => "TCR_ARBITRATOR",
      EntityKind::Badge => "BADGE",
      EntityKind::BadgeMetadata => "BADGE_METADATA",
      EntityKind::BadgeItemLink => "BADGE_ITEM_LINK",
      EntityKind::User => "BADGE_USER",
      EntityKind::UserStatistics => "BADGE_USER_STATISTICS",
      EntityKind::ProtocolStatistics => "BADGE_PROTOCOL_STATISTICS",
    }
  }

  fn table(&self) -> TableDefinition<'static, &'static str, &'static [u8]> {
    TableDefinition::new(self.table_name())
  }
}

/// Key-value persistence of entities. Keys are the string form of the entity's composite key
/// and values are opaque encoded entities.
pub trait EntityStore {
  fn load(&self, kind: EntityKind, key: &str) -> Result<Option<Vec<u8>>>;

  fn upsert(&self, kind: EntityKind, key: &str, value: &[u8]) -> Result<()>;

  fn delete(&self, kind: EntityKind, key: &str) -> Result<()>;
}

/// A key that is serialized to a scalar only at the storage boundary
pub trait StorageKey: Debug {
  fn storage_key(&self) -> String;
}

pub trait Entity: Serialize + DeserializeOwned {
  const KIND: EntityKind;
  type Key: StorageKey;

  fn key(&self) -> Self::Key;
}

/// Typed access on top of any [`EntityStore`]
pub trait Entities {
  fn get<E: Entity>(&self, key: &E::Key) -> Result<Option<E>>;

  fn put<E: Entity>(&self, entity: &E) -> Result<()>;

  fn remove<E: Entity>(&self, key: &E::Key) -> Result<()>;

  /// Like [`Entities::get`] but a missing entity is a non-blocking missing reference
  fn require<E: Entity>(&self, key: &E::Key) -> Result<E> {
    self
      .get::<E>(key)?
      .ok_or_else(|| crate::protocol::error::Error::missing(E::KIND, key.storage_key()))
  }
}

impl<S: EntityStore + ?Sized> Entities for S {
  fn get<E: Entity>(&self, key: &E::Key) -> Result<Option<E>> {
    match self.load(E::KIND, &key.storage_key())? {
      Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
      None => Ok(None),
    }
  }

  fn put<E: Entity>(&self, entity: &E) -> Result<()> {
    let bytes = serde_json::to_vec(entity)?;
    self.upsert(E::KIND, &entity.key().storage_key(), &bytes)
  }

  fn remove<E: Entity>(&self, key: &E::Key) -> Result<()> {
    self.delete(E::KIND, &key.storage_key())
  }
}

/// Lowercase `0x` prefixed hex, the form identifiers take inside storage keys
pub fn hex_key(bytes: &[u8]) -> String {
  format!("0x{}", hex::encode(bytes))
}

/// Scalar keys such as addresses and badge ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScalarKey<T>(pub T);

impl StorageKey for ScalarKey<alloy_primitives::Address> {
  fn storage_key(&self) -> String {
    hex_key(self.0.as_slice())
  }
}

impl StorageKey for ScalarKey<alloy_primitives::U256> {
  fn storage_key(&self) -> String {
    self.0.to_string()
  }
}

impl<T: Display> Display for ScalarKey<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.0.fmt(f)
  }
}

/// Entities persisted in redb, one table per kind. Every write is committed on its own.
pub struct RedbStore {
  database: Database,
}

impl RedbStore {
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let database = Database::create(path)?;
    Ok(Self { database })
  }

  pub fn new(database: Database) -> Self {
    Self { database }
  }
}

impl EntityStore for RedbStore {
  fn load(&self, kind: EntityKind, key: &str) -> Result<Option<Vec<u8>>> {
    let rtx = self.database.begin_read()?;
    let table = match rtx.open_table(kind.table()) {
      Ok(table) => table,
      Err(TableError::TableDoesNotExist(_)) => return Ok(None),
      Err(e) => return Err(e.into()),
    };
    let value = table.get(key)?.map(|v| v.value().to_vec());
    Ok(value)
  }

  fn upsert(&self, kind: EntityKind, key: &str, value: &[u8]) -> Result<()> {
    let wtx = self.database.begin_write()?;
    {
      let mut table = wtx.open_table(kind.table())?;
      table.insert(key, value)?;
    }
    wtx.commit()?;
    Ok(())
  }

  fn delete(&self, kind: EntityKind, key: &str) -> Result<()> {
    let wtx = self.database.begin_write()?;
    {
      let mut table = wtx.open_table(kind.table())?;
      table.remove(key)?;
    }
    wtx.commit()?;
    Ok(())
  }
}

/// Entities kept in memory, for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: RefCell<BTreeMap<(EntityKind, String), Vec<u8>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of stored entities of the given kind
  pub fn count(&self, kind: EntityKind) -> usize {
    self
      .entries
      .borrow()
      .keys()
      .filter(|(k, _)| *k == kind)
      .count()
  }
}

impl EntityStore for MemoryStore {
  fn load(&self, kind: EntityKind, key: &str) -> Result<Option<Vec<u8>>> {
    Ok(self.entries.borrow().get(&(kind, key.to_string())).cloned())
  }

  fn upsert(&self, kind: EntityKind, key: &str, value: &[u8]) -> Result<()> {
    self
      .entries
      .borrow_mut()
      .insert((kind, key.to_string()), value.to_vec());
    Ok(())
  }

  fn delete(&self, kind: EntityKind, key: &str) -> Result<()> {
    self.entries.borrow_mut().remove(&(kind, key.to_string()));
    Ok(())
  }
}
