//! Badge projection errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Duplicated badge mint {0}")]
  DuplicatedBadge(String),
  #[error("Statistic {0} overflows")]
  StatisticOverflow(&'static str),
}
