use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tcr_index::config::{Command, Config, Options};
use tcr_index::protocol::badge::BadgeProjector;
use tcr_index::protocol::chain::SnapshotChainReader;
use tcr_index::protocol::content::{ContentFetcher, DirectoryFetcher, NoContent};
use tcr_index::protocol::storage::{Entities, RedbStore, ScalarKey};
use tcr_index::protocol::tcr::{LifecycleEngine, Registry, StatusCounters};
use tcr_index::{EventIngestor, EventKind, Handler, LogEvent};

fn main() -> Result<()> {
  env_logger::init();

  let options = Options::parse();
  let config = match &options.config {
    Some(path) => Config::load(path)?,
    None => Config::default(),
  }
  .merge(&options);

  match &options.command {
    Command::Replay {
      events,
      chain_state,
    } => replay(&config, events, chain_state),
  }
}

fn replay(config: &Config, events: &Path, chain_state: &Path) -> Result<()> {
  let data = fs::read(events).with_context(|| format!("reading {}", events.display()))?;
  let events: Vec<LogEvent> =
    serde_json::from_slice(&data).with_context(|| format!("parsing {}", events.display()))?;
  let chain = SnapshotChainReader::load(chain_state)
    .with_context(|| format!("loading {}", chain_state.display()))?;

  let index = config.index_path();
  let store =
    RedbStore::open(&index).with_context(|| format!("opening index {}", index.display()))?;

  let directory;
  let content: &dyn ContentFetcher = match &config.content_dir {
    Some(dir) => {
      directory = DirectoryFetcher::new(dir);
      &directory
    }
    None => &NoContent,
  };

  let registries = events
    .iter()
    .filter_map(|e| match e.kind {
      EventKind::RegistryCreated { registry } => Some(registry),
      _ => None,
    })
    .collect::<Vec<_>>();

  let mut ingestor = EventIngestor::new(vec![
    Handler::Lifecycle(LifecycleEngine::new(&store, &chain, content)),
    Handler::Badge(BadgeProjector::new(&store, &chain)),
  ]);
  if !config.tracked_contracts.is_empty() {
    ingestor = ingestor.with_tracked_contracts(config.tracked_contracts.iter().copied());
  }

  let mut recorded = 0;
  for event in events {
    if ingestor.record_event(event) {
      recorded += 1;
    }
  }
  log::info!("replaying {recorded} events into {}", index.display());
  ingestor.process()?;

  let mut counters = BTreeMap::<String, StatusCounters>::new();
  for address in registries {
    if let Some(registry) = store.get::<Registry>(&ScalarKey(address))? {
      counters.insert(address.to_string(), registry.counters);
    }
  }
  println!("{}", serde_json::to_string_pretty(&counters)?);

  Ok(())
}
