//! Indexes light curated registries: items, requests, disputes, evidence and the per status
//! item counters of every registry, plus the badges backed by registry items.

pub mod config;
pub mod protocol;

pub use crate::protocol::handler::{EventIngestor, Handler};
pub use crate::protocol::{EventHandler, EventKind, EventMeta, LogEvent};
