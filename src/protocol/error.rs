//! The error for all the protocols

use crate::protocol::badge::Error as BadgeError;
use crate::protocol::storage::EntityKind;
use crate::protocol::tcr::Error as TcrError;
use thiserror::Error;

/// Errors that do not block the event loop
#[derive(Debug, Error)]
pub enum NonBlockingError {
  #[error("Registry protocol error: {0}")]
  Tcr(TcrError),
  #[error("Badge protocol error: {0}")]
  Badge(BadgeError),
  /// An entity the event refers to was never indexed
  #[error("{kind:?} {key} not found")]
  MissingReference { kind: EntityKind, key: String },
  /// The chain answered with a code outside the known set
  #[error("Unexpected {field} value {value} for {key}")]
  UnexpectedStatus {
    field: &'static str,
    value: u64,
    key: String,
  },
}

#[derive(Debug, Error)]
pub enum BlockingError {
  #[error("Cannot perform storage related functions {0}")]
  Storage(redb::Error),
  #[error("Cannot encode or decode entity {0}")]
  Codec(serde_json::Error),
  #[error("Chain reader failed: {0}")]
  Chain(String),
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("Non-blocking error {0}")]
  NonBlocking(NonBlockingError),
  #[error("Blocking error encountered {0}")]
  Blocking(BlockingError),
}

impl Error {
  pub fn missing(kind: EntityKind, key: impl ToString) -> Self {
    Self::NonBlocking(NonBlockingError::MissingReference {
      kind,
      key: key.to_string(),
    })
  }

  pub fn unexpected(field: &'static str, value: u64, key: impl ToString) -> Self {
    Self::NonBlocking(NonBlockingError::UnexpectedStatus {
      field,
      value,
      key: key.to_string(),
    })
  }

  pub fn chain(message: impl ToString) -> Self {
    Self::Blocking(BlockingError::Chain(message.to_string()))
  }

  pub fn is_blocking(&self) -> bool {
    matches!(self, Self::Blocking(_))
  }
}

impl From<TcrError> for Error {
  fn from(e: TcrError) -> Self {
    Self::NonBlocking(NonBlockingError::Tcr(e))
  }
}

impl From<BadgeError> for Error {
  fn from(e: BadgeError) -> Self {
    Self::NonBlocking(NonBlockingError::Badge(e))
  }
}

impl From<serde_json::Error> for Error {
  fn from(err: serde_json::Error) -> Self {
    Self::Blocking(BlockingError::Codec(err))
  }
}

impl From<redb::Error> for Error {
  fn from(err: redb::Error) -> Self {
    Self::Blocking(BlockingError::Storage(err))
  }
}

impl From<redb::StorageError> for Error {
  fn from(err: redb::StorageError) -> Self {
    redb::Error::from(err).into()
  }
}

impl From<redb::TableError> for Error {
  fn from(err: redb::TableError) -> Self {
    redb::Error::from(err).into()
  }
}

impl From<redb::TransactionError> for Error {
  fn from(err: redb::TransactionError) -> Self {
    redb::Error::from(err).into()
  }
}

impl From<redb::CommitError> for Error {
  fn from(err: redb::CommitError) -> Self {
    redb::Error::from(err).into()
  }
}

impl From<redb::DatabaseError> for Error {
  fn from(err: redb::DatabaseError) -> Self {
    redb::Error::from(err).into()
  }
}
