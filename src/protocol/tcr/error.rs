//! Registry lifecycle errors

use crate::protocol::tcr::types::{ExtendedStatus, ItemKey, RequestKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Counter for {0} would drop below zero")]
  CounterUnderflow(ExtendedStatus),
  #[error("Counter for {0} overflows")]
  CounterOverflow(ExtendedStatus),
  #[error("Duplicated registry creation {0}")]
  DuplicatedRegistry(String),
  #[error("Duplicated item {0}")]
  DuplicatedItem(ItemKey),
  #[error("Item {0} has no request")]
  NoRequest(ItemKey),
  #[error("Dispute {dispute_id} of arbitrator {arbitrator} does not belong to registry {registry}")]
  UnknownDispute {
    registry: String,
    arbitrator: String,
    dispute_id: String,
  },
  #[error("Request {0} is already resolved")]
  AlreadyResolved(RequestKey),
}
