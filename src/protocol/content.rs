//! Off-chain item content. Fetching is best effort: a failure is recorded on the item,
//! it never aborts the handler.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Value stored for properties whose value is missing, null or of an unsupported kind.
/// Empty values would make the item disappear from listings.
pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("Unsupported content uri {0}")]
  UnsupportedUri(String),
  #[error("Content {uri} not available: {source}")]
  Unavailable {
    uri: String,
    source: std::io::Error,
  },
}

/// Resolves content addressed uris to raw bytes
pub trait ContentFetcher {
  fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError>;
}

/// Serves `/ipfs/<cid>/<path>` and `ipfs://<cid>/<path>` from a local mirror directory
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
  root: PathBuf,
}

impl DirectoryFetcher {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn resolve(&self, uri: &str) -> Option<PathBuf> {
    let relative = uri
      .strip_prefix("ipfs://")
      .or_else(|| uri.strip_prefix("/ipfs/"))?;
    let relative = Path::new(relative);
    // no escaping the mirror root
    if relative
      .components()
      .any(|c| !matches!(c, Component::Normal(_)))
    {
      return None;
    }
    Some(self.root.join(relative))
  }
}

impl ContentFetcher for DirectoryFetcher {
  fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
    let path = self
      .resolve(uri)
      .ok_or_else(|| FetchError::UnsupportedUri(uri.to_string()))?;
    fs::read(path).map_err(|source| FetchError::Unavailable {
      uri: uri.to_string(),
      source,
    })
  }
}

/// A fetcher that never finds anything, for running without a content mirror
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContent;

impl ContentFetcher for NoContent {
  fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
    Err(FetchError::UnsupportedUri(uri.to_string()))
  }
}

/// How far the item's off-chain content could be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentStatus {
  Pending,
  Fetched,
  Unavailable,
  Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemProp {
  pub label: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub value: String,
  pub is_identifier: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct Column {
  label: Option<Value>,
  #[serde(rename = "type")]
  kind: Option<Value>,
  #[serde(rename = "isIdentifier")]
  is_identifier: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct ItemDocument {
  columns: Vec<Column>,
  values: serde_json::Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum ContentError {
  #[error("Item content is not valid json: {0}")]
  Json(#[from] serde_json::Error),
}

/// Parses a `{ "columns": [...], "values": {...} }` item document into properties
pub fn parse_item_props(data: &[u8]) -> Result<Vec<ItemProp>, ContentError> {
  let document: ItemDocument = serde_json::from_slice(data)?;
  let props = document
    .columns
    .iter()
    .map(|column| {
      let label = maybe_string(column.label.as_ref());
      let value = maybe_string(document.values.get(&label));
      ItemProp {
        kind: maybe_string(column.kind.as_ref()),
        is_identifier: maybe_bool(column.is_identifier.as_ref()),
        label,
        value,
      }
    })
    .collect();
  Ok(props)
}

fn maybe_string(value: Option<&Value>) -> String {
  match value {
    Some(Value::Bool(b)) => b.to_string(),
    Some(Value::String(s)) => s.clone(),
    Some(Value::Number(n)) => match n.as_u64() {
      Some(n) => format!("0x{n:x}"),
      None => n.to_string(),
    },
    _ => PLACEHOLDER.to_string(),
  }
}

fn maybe_bool(value: Option<&Value>) -> bool {
  match value {
    Some(Value::Bool(b)) => *b,
    Some(Value::String(s)) => s == "true",
    Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0).unwrap_or_default(),
    _ => false,
  }
}
