use super::*;
use pretty_assertions::assert_eq;
use tcr_index::protocol::content::ContentStatus;
use tcr_index::protocol::storage::EntityKind;
use tcr_index::protocol::tcr::{
  Arbitrator, DisputeOutcome, Evidence, ItemStatus, RequestType,
};

#[test]
fn registration_request() {
  let mut scenario = Scenario::with_registry();
  scenario.submit_item(ITEM, 7);
  scenario.process().unwrap();

  let item = scenario.item(ITEM);
  assert_eq!(item.status, ItemStatus::RegistrationRequested);
  assert_eq!(item.number_of_requests, 1);
  assert_eq!(item.latest_requester, REQUESTER);
  assert!(item.accounted);

  let request = scenario.request(ITEM, 0);
  assert_eq!(request.request_type, RequestType::Registration);
  assert_eq!(request.requester, REQUESTER);
  assert_eq!(request.arbitrator, ARBITRATOR);
  assert_eq!(request.evidence_group_id, U256::from(7));
  assert!(!request.resolved);

  assert_eq!(
    scenario.counters(),
    vec![(ExtendedStatus::RegistrationRequested, 1)]
  );
  scenario.assert_conserved(&[ITEM]);
}

#[test]
fn unchallenged_request_is_executed() {
  let mut scenario = Scenario::with_registry();
  scenario.submit_item(ITEM, 7).resolve(ITEM, 1, 1, 0);
  scenario.process().unwrap();

  let item = scenario.item(ITEM);
  assert_eq!(item.status, ItemStatus::Registered);
  assert_eq!(item.latest_request_resolution_time, scenario.timestamp());

  let request = scenario.request(ITEM, 0);
  assert!(request.resolved);
  assert_eq!(request.dispute_outcome, DisputeOutcome::None);
  assert_eq!(request.resolution_time, Some(scenario.timestamp()));

  assert_eq!(scenario.counters(), vec![(ExtendedStatus::Registered, 1)]);
  scenario.assert_conserved(&[ITEM]);
}

#[test]
fn challenge_then_accept() {
  let mut scenario = Scenario::with_registry();
  scenario.submit_item(ITEM, 7).challenge(ITEM, 1, 3);
  scenario.process().unwrap();

  let item = scenario.item(ITEM);
  assert!(item.disputed);
  assert_eq!(item.latest_challenger, CHALLENGER);
  let request = scenario.request(ITEM, 0);
  assert!(request.disputed);
  assert_eq!(request.challenger, Some(CHALLENGER));
  assert_eq!(request.dispute_id, Some(U256::from(3)));
  assert_eq!(
    scenario.counters(),
    vec![(ExtendedStatus::ChallengedRegistration, 1)]
  );
  scenario.assert_conserved(&[ITEM]);

  scenario
    .emit(
      REGISTRY,
      ARBITRATOR,
      EventKind::Ruling {
        arbitrator: ARBITRATOR,
        dispute_id: U256::from(3),
        ruling: U256::from(1),
      },
    )
    .resolve(ITEM, 1, 1, 1);
  scenario.process().unwrap();

  let item = scenario.item(ITEM);
  assert!(!item.disputed);
  assert_eq!(item.status, ItemStatus::Registered);
  assert_eq!(
    scenario.request(ITEM, 0).dispute_outcome,
    DisputeOutcome::Accept
  );
  assert_eq!(scenario.counters(), vec![(ExtendedStatus::Registered, 1)]);
  scenario.assert_conserved(&[ITEM]);
}

#[test]
fn challenge_then_reject() {
  let mut scenario = Scenario::with_registry();
  scenario
    .submit_item(ITEM, 7)
    .challenge(ITEM, 1, 3)
    .resolve(ITEM, 1, 0, 2);
  scenario.process().unwrap();

  assert_eq!(scenario.item(ITEM).status, ItemStatus::Absent);
  assert_eq!(
    scenario.request(ITEM, 0).dispute_outcome,
    DisputeOutcome::Reject
  );
  assert_eq!(scenario.counters(), vec![(ExtendedStatus::Absent, 1)]);
}

#[test]
fn resolution_is_idempotent() {
  let mut scenario = Scenario::with_registry();
  scenario.submit_item(ITEM, 7).resolve(ITEM, 1, 1, 0);
  scenario.process().unwrap();
  let request = scenario.request(ITEM, 0);

  scenario.emit(
    REGISTRY,
    REQUESTER,
    EventKind::ItemStatusChange {
      item_id: ITEM,
      updated_directly: false,
    },
  );
  scenario.process().unwrap();

  assert_eq!(scenario.request(ITEM, 0), request);
  assert_eq!(scenario.counters(), vec![(ExtendedStatus::Registered, 1)]);
}

#[test]
fn request_indices_are_monotonic() {
  let mut scenario = Scenario::with_registry();
  scenario
    .submit_item(ITEM, 7)
    .resolve(ITEM, 1, 1, 0)
    .set_item(ITEM, 3, 2, false)
    .emit(
      REGISTRY,
      CHALLENGER,
      EventKind::RequestSubmitted {
        item_id: ITEM,
        evidence_group_id: U256::from(8),
      },
    );
  scenario.process().unwrap();

  let item = scenario.item(ITEM);
  assert_eq!(item.number_of_requests, 2);
  assert_eq!(item.latest_requester, CHALLENGER);
  assert_eq!(item.latest_request_resolution_time, 0);

  let removal = scenario.request(ITEM, 1);
  assert_eq!(removal.request_type, RequestType::Clearing);
  assert_eq!(removal.requester, CHALLENGER);
  // the first request is left as it was resolved
  assert!(scenario.request(ITEM, 0).resolved);

  assert_eq!(
    scenario.counters(),
    vec![(ExtendedStatus::ClearingRequested, 1)]
  );

  scenario.challenge(ITEM, 2, 4).resolve(ITEM, 2, 0, 1);
  scenario.process().unwrap();
  assert_eq!(scenario.counters(), vec![(ExtendedStatus::Absent, 1)]);
  scenario.assert_conserved(&[ITEM]);
}

#[test]
fn direct_addition_is_accounted() {
  let mut scenario = Scenario::with_registry();
  scenario
    .set_item(ITEM, 1, 0, false)
    .emit(
      REGISTRY,
      REQUESTER,
      EventKind::NewItem {
        item_id: ITEM,
        data: "/ipfs/QmItem/item.json".into(),
      },
    )
    .emit(
      REGISTRY,
      REQUESTER,
      EventKind::ItemStatusChange {
        item_id: ITEM,
        updated_directly: true,
      },
    );
  scenario.process().unwrap();

  let item = scenario.item(ITEM);
  assert_eq!(item.status, ItemStatus::Registered);
  assert_eq!(item.number_of_requests, 0);
  assert_eq!(scenario.store.count(EntityKind::Request), 0);
  assert_eq!(scenario.counters(), vec![(ExtendedStatus::Registered, 1)]);
  scenario.assert_conserved(&[ITEM]);
}

#[test]
fn counters_are_conserved_across_items() {
  let other = B256::with_last_byte(0x20);
  let third = B256::with_last_byte(0x30);
  let mut scenario = Scenario::with_registry();
  scenario
    .submit_item(ITEM, 1)
    .submit_item(other, 2)
    .submit_item(third, 3)
    .challenge(other, 1, 9)
    .resolve(ITEM, 1, 1, 0);
  scenario.process().unwrap();

  assert_eq!(
    scenario.counters(),
    vec![
      (ExtendedStatus::Registered, 1),
      (ExtendedStatus::RegistrationRequested, 1),
      (ExtendedStatus::ChallengedRegistration, 1),
    ]
  );
  scenario.assert_conserved(&[ITEM, other, third]);
}

#[test]
fn evidence_is_numbered_per_request() {
  let mut scenario = Scenario::with_registry();
  scenario.submit_item(ITEM, 7);
  for party in [REQUESTER, CHALLENGER] {
    scenario.emit(
      REGISTRY,
      party,
      EventKind::Evidence {
        arbitrator: ARBITRATOR,
        evidence_group_id: U256::from(7),
        party,
        uri: format!("/ipfs/{party}/evidence.json"),
      },
    );
  }
  scenario.process().unwrap();

  let request = ItemKey::new(REGISTRY, ITEM).request(0);
  assert_eq!(scenario.request(ITEM, 0).number_of_evidence, 2);
  let first = scenario.require::<Evidence>(&request.evidence(0));
  let second = scenario.require::<Evidence>(&request.evidence(1));
  assert_eq!((first.number, first.party), (0, REQUESTER));
  assert_eq!((second.number, second.party), (1, CHALLENGER));
}

#[test]
fn evidence_for_unknown_group_is_skipped() {
  let mut scenario = Scenario::with_registry();
  scenario.submit_item(ITEM, 7).emit(
    REGISTRY,
    REQUESTER,
    EventKind::Evidence {
      arbitrator: ARBITRATOR,
      evidence_group_id: U256::from(99),
      party: REQUESTER,
      uri: "/ipfs/evidence.json".into(),
    },
  );
  scenario.process().unwrap();

  assert_eq!(scenario.store.count(EntityKind::Evidence), 0);
  assert_eq!(scenario.request(ITEM, 0).number_of_evidence, 0);
}

#[test]
fn meta_evidence_documents() {
  let mut scenario = Scenario::with_registry();
  scenario.emit(
    REGISTRY,
    REQUESTER,
    EventKind::MetaEvidence {
      meta_evidence_id: U256::from(2),
      uri: "/ipfs/registration-v2.json".into(),
    },
  );
  scenario.process().unwrap();

  let registry = scenario.registry();
  assert_eq!(registry.meta_evidence_count, 3);
  assert_eq!(
    registry.registration_meta_evidence.as_deref(),
    Some("/ipfs/registration-v2.json")
  );
  assert_eq!(
    registry.clearing_meta_evidence.as_deref(),
    Some("/ipfs/clearing.json")
  );

  let arbitrator = scenario.require::<Arbitrator>(&ScalarKey(ARBITRATOR));
  assert_eq!(arbitrator.first_seen_registry, REGISTRY);
  assert_eq!(scenario.store.count(EntityKind::Arbitrator), 1);
}

#[test]
fn item_content_is_parsed() {
  let dir = tempfile::TempDir::new().unwrap();
  std::fs::create_dir_all(dir.path().join("QmItem")).unwrap();
  std::fs::write(
    dir.path().join("QmItem/item.json"),
    r#"{
      "columns": [{ "label": "Name", "type": "text", "isIdentifier": true }],
      "values": { "Name": "Example" }
    }"#,
  )
  .unwrap();

  let mut scenario = Scenario::with_registry().with_content_dir(dir.path());
  scenario.set_item(ITEM, 2, 1, false).emit(
    REGISTRY,
    REQUESTER,
    EventKind::NewItem {
      item_id: ITEM,
      data: "/ipfs/QmItem/item.json".into(),
    },
  );
  scenario.process().unwrap();

  let item = scenario.item(ITEM);
  assert_eq!(item.content, ContentStatus::Fetched);
  assert_eq!(item.props.len(), 1);
  assert_eq!(item.props[0].value, "Example");
  assert!(item.props[0].is_identifier);
}

#[test]
fn content_fetch_failure_keeps_the_item() {
  let dir = tempfile::TempDir::new().unwrap();
  let mut scenario = Scenario::with_registry().with_content_dir(dir.path());
  scenario.submit_item(ITEM, 7);
  scenario.process().unwrap();

  let item = scenario.item(ITEM);
  assert_eq!(item.content, ContentStatus::Unavailable);
  assert!(item.props.is_empty());
  assert_eq!(item.status, ItemStatus::RegistrationRequested);
  assert_eq!(
    scenario.counters(),
    vec![(ExtendedStatus::RegistrationRequested, 1)]
  );
}

#[test]
fn unknown_status_code_is_skipped() {
  let mut scenario = Scenario::with_registry();
  scenario.set_item(ITEM, 7, 0, false).emit(
    REGISTRY,
    REQUESTER,
    EventKind::NewItem {
      item_id: ITEM,
      data: "/ipfs/QmItem/item.json".into(),
    },
  );
  scenario.process().unwrap();

  assert_eq!(scenario.store.count(EntityKind::Item), 0);
}

#[test]
fn unknown_ruling_is_flagged() {
  let mut scenario = Scenario::with_registry();
  scenario
    .submit_item(ITEM, 7)
    .challenge(ITEM, 1, 3)
    .resolve(ITEM, 1, 1, 9);
  scenario.process().unwrap();

  assert_eq!(
    scenario.request(ITEM, 0).dispute_outcome,
    DisputeOutcome::Error
  );
  assert_eq!(scenario.counters(), vec![(ExtendedStatus::Registered, 1)]);
}

#[test]
fn events_of_unknown_registries_are_skipped() {
  let mut scenario = Scenario::new();
  scenario.submit_item(ITEM, 7);
  scenario.process().unwrap();

  assert_eq!(scenario.store.count(EntityKind::Item), 0);
  assert_eq!(scenario.store.count(EntityKind::Request), 0);
}

#[test]
fn request_for_unseen_item_is_skipped() {
  let mut scenario = Scenario::with_registry();
  scenario.set_item(ITEM, 2, 1, false).emit(
    REGISTRY,
    REQUESTER,
    EventKind::RequestSubmitted {
      item_id: ITEM,
      evidence_group_id: U256::from(7),
    },
  );
  scenario.process().unwrap();

  assert_eq!(scenario.store.count(EntityKind::Item), 0);
  assert_eq!(scenario.store.count(EntityKind::Request), 0);
  assert_eq!(scenario.store.count(EntityKind::EvidenceGroup), 0);
  assert_eq!(scenario.counters(), vec![]);
}

#[test]
fn status_change_of_unknown_item_is_skipped() {
  let other_registry = Address::with_last_byte(0x77);
  let other_item = B256::with_last_byte(0x99);

  let mut scenario = Scenario::with_registry();
  // no contract state is known for either item
  scenario
    .emit(
      other_registry,
      REQUESTER,
      EventKind::ItemStatusChange {
        item_id: other_item,
        updated_directly: false,
      },
    )
    .emit(
      REGISTRY,
      REQUESTER,
      EventKind::ItemStatusChange {
        item_id: other_item,
        updated_directly: true,
      },
    )
    .submit_item(ITEM, 7);
  scenario.process().unwrap();

  assert_eq!(scenario.store.count(EntityKind::Item), 1);
  assert_eq!(scenario.item(ITEM).status, ItemStatus::RegistrationRequested);
  assert_eq!(
    scenario.counters(),
    vec![(ExtendedStatus::RegistrationRequested, 1)]
  );
}

#[test]
fn dispute_unknown_to_the_chain_is_skipped() {
  let mut scenario = Scenario::with_registry();
  scenario.submit_item(ITEM, 7).emit(
    REGISTRY,
    CHALLENGER,
    EventKind::Dispute {
      arbitrator: ARBITRATOR,
      dispute_id: U256::from(99),
      meta_evidence_id: U256::from(0),
      evidence_group_id: U256::from(0),
    },
  );
  scenario.process().unwrap();

  let item = scenario.item(ITEM);
  assert!(!item.disputed);
  assert_eq!(item.latest_challenger, Address::ZERO);
  let request = scenario.request(ITEM, 0);
  assert!(!request.disputed);
  assert_eq!(request.challenger, None);
  assert_eq!(
    scenario.counters(),
    vec![(ExtendedStatus::RegistrationRequested, 1)]
  );

  // later disputes are still handled
  scenario.challenge(ITEM, 1, 3);
  scenario.process().unwrap();
  assert_eq!(
    scenario.counters(),
    vec![(ExtendedStatus::ChallengedRegistration, 1)]
  );
}

#[test]
fn ruling_of_unknown_dispute_is_skipped() {
  let mut scenario = Scenario::with_registry();
  scenario.submit_item(ITEM, 7).emit(
    REGISTRY,
    ARBITRATOR,
    EventKind::Ruling {
      arbitrator: ARBITRATOR,
      dispute_id: U256::from(99),
      ruling: U256::from(1),
    },
  );
  scenario.process().unwrap();

  let request = scenario.request(ITEM, 0);
  assert_eq!(request.resolution_time, None);
  assert!(!request.resolved);
  assert_eq!(
    scenario.counters(),
    vec![(ExtendedStatus::RegistrationRequested, 1)]
  );

  scenario.resolve(ITEM, 1, 1, 0);
  scenario.process().unwrap();
  assert_eq!(scenario.counters(), vec![(ExtendedStatus::Registered, 1)]);
}

#[test]
fn dispute_of_unseen_item_is_skipped() {
  let unseen = B256::with_last_byte(0x99);

  let mut scenario = Scenario::with_registry();
  scenario.submit_item(ITEM, 7).challenge(unseen, 1, 3);
  scenario.process().unwrap();

  assert_eq!(scenario.store.count(EntityKind::Item), 1);
  assert_eq!(scenario.store.count(EntityKind::Request), 1);
  assert!(!scenario.item(ITEM).disputed);
  assert!(!scenario.request(ITEM, 0).disputed);
  assert_eq!(
    scenario.counters(),
    vec![(ExtendedStatus::RegistrationRequested, 1)]
  );
}

#[test]
fn ruling_only_records_its_time() {
  let mut scenario = Scenario::with_registry();
  scenario.submit_item(ITEM, 7).challenge(ITEM, 1, 3).emit(
    REGISTRY,
    ARBITRATOR,
    EventKind::Ruling {
      arbitrator: ARBITRATOR,
      dispute_id: U256::from(3),
      ruling: U256::MAX,
    },
  );
  scenario.process().unwrap();

  let request = scenario.request(ITEM, 0);
  assert_eq!(request.resolution_time, Some(scenario.timestamp()));
  assert!(!request.resolved);
  assert_eq!(request.dispute_outcome, DisputeOutcome::None);
  assert_eq!(
    scenario.counters(),
    vec![(ExtendedStatus::ChallengedRegistration, 1)]
  );
}
