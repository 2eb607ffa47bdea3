//! Command line options and the configuration file

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "tcr-index", version)]
#[command(about = "Indexes light curated registries and the badges they back")]
pub struct Options {
  /// Load configuration from <CONFIG>
  #[arg(long)]
  pub config: Option<PathBuf>,
  /// Store the index in <INDEX>
  #[arg(long)]
  pub index: Option<PathBuf>,
  /// Resolve item content uris under <CONTENT_DIR>
  #[arg(long)]
  pub content_dir: Option<PathBuf>,
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Replay recorded events against a snapshot of the contract state
  Replay {
    /// JSON array of events
    #[arg(long)]
    events: PathBuf,
    /// JSON chain snapshot the events are read against
    #[arg(long)]
    chain_state: PathBuf,
  },
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "snake_case")]
pub struct Config {
  pub index: Option<PathBuf>,
  pub content_dir: Option<PathBuf>,
  /// Contracts whose events are indexed, all of them when empty
  pub tracked_contracts: Vec<Address>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Cannot read config file {path}: {source}")]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("Invalid config file {path}: {source}")]
  Yaml {
    path: PathBuf,
    source: serde_yaml::Error,
  },
}

impl Config {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.into(),
      source,
    })?;
    serde_yaml::from_str(&data).map_err(|source| ConfigError::Yaml {
      path: path.into(),
      source,
    })
  }

  /// Command line flags take precedence over the file
  pub fn merge(mut self, options: &Options) -> Self {
    if let Some(index) = &options.index {
      self.index = Some(index.clone());
    }
    if let Some(content_dir) = &options.content_dir {
      self.content_dir = Some(content_dir.clone());
    }
    self
  }

  pub fn index_path(&self) -> PathBuf {
    self
      .index
      .clone()
      .unwrap_or_else(|| PathBuf::from("index.redb"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_yaml() {
    let config: Config = serde_yaml::from_str(
      r#"
index: /var/lib/tcr/index.redb
tracked_contracts:
  - "0x00000000000000000000000000000000000000aa"
"#,
    )
    .unwrap();

    assert_eq!(
      config,
      Config {
        index: Some("/var/lib/tcr/index.redb".into()),
        content_dir: None,
        tracked_contracts: vec![Address::with_last_byte(0xaa)],
      }
    );
  }

  #[test]
  fn test_unknown_field_is_rejected() {
    assert!(serde_yaml::from_str::<Config>("indexx: foo").is_err());
  }

  #[test]
  fn test_flags_override_file() {
    let options = Options::try_parse_from([
      "tcr-index",
      "--index",
      "flag.redb",
      "replay",
      "--events",
      "events.json",
      "--chain-state",
      "chain.json",
    ])
    .unwrap();

    let config = Config {
      index: Some("file.redb".into()),
      content_dir: Some("content".into()),
      tracked_contracts: vec![],
    }
    .merge(&options);

    assert_eq!(config.index_path(), PathBuf::from("flag.redb"));
    assert_eq!(config.content_dir, Some("content".into()));
  }

  #[test]
  fn test_missing_file() {
    let dir = tempfile::TempDir::new().unwrap();
    assert!(matches!(
      Config::load(&dir.path().join("missing.yaml")),
      Err(ConfigError::Io { .. })
    ));
  }
}
