use famtrip_core::db::open_db_in_memory;
use famtrip_core::{
    ingest_json, Activity, IngestError, PlannerService, SqliteActivityRepository, VoteType,
};

const PAYLOAD: &str = r#"[
    {
        "id": "00000000-0000-4000-8000-000000000001",
        "group_id": "family-1",
        "title": "Aquarium",
        "created_at": 100,
        "votes": {"mom": "yes", "kid": "maybe"}
    },
    {
        "id": "00000000-0000-4000-8000-000000000002",
        "group_id": "family-1",
        "title": "Mystery",
        "created_at": 200,
        "votes": {"dad": "absolutely"}
    },
    {
        "id": "00000000-0000-4000-8000-000000000003",
        "group_id": "family-1",
        "title": "Planetarium",
        "scheduled_time": 9000,
        "created_at": 300,
        "status": "confirmed"
    },
    {
        "group_id": "family-1",
        "title": "No id"
    }
]"#;

#[test]
fn ingest_json_keeps_valid_records_and_reports_the_rest() {
    let outcome = ingest_json(PAYLOAD).unwrap();

    assert_eq!(outcome.activities.len(), 2);
    assert_eq!(outcome.activities[0].title, "Aquarium");
    assert_eq!(outcome.activities[0].vote_of("kid"), Some(VoteType::Maybe));
    assert_eq!(outcome.rejected.len(), 2);
    assert!(matches!(
        &outcome.rejected[0],
        IngestError::MalformedRecord { record_id, .. }
            if record_id == "00000000-0000-4000-8000-000000000002"
    ));
    assert!(matches!(
        &outcome.rejected[1],
        IngestError::MalformedRecord { record_id, .. } if record_id == "#3"
    ));
}

#[test]
fn ingest_json_rejects_non_array_payload() {
    let err = ingest_json(r#"{"id": "x"}"#).unwrap_err();
    assert!(matches!(err, IngestError::InvalidPayload(_)));
}

#[test]
fn imported_activities_show_up_ranked_on_board() {
    let outcome = ingest_json(PAYLOAD).unwrap();
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteActivityRepository::try_new(&mut conn).unwrap();
    let mut service = PlannerService::new(repo);

    assert_eq!(service.import_activities(&outcome.activities).unwrap(), 2);

    let board = service.board("family-1").unwrap();
    let titles: Vec<&str> = board
        .entries
        .iter()
        .map(|entry| entry.activity.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Aquarium", "Planetarium"]);
    assert_eq!(board.entries[0].activity.created_at, 100);
    assert_eq!(board.entries[0].tally.total_voters, 2);
}

#[test]
fn reimporting_the_same_payload_is_idempotent() {
    let outcome = ingest_json(PAYLOAD).unwrap();
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteActivityRepository::try_new(&mut conn).unwrap();
    let mut service = PlannerService::new(repo);

    assert_eq!(service.import_activities(&outcome.activities).unwrap(), 2);
    let first = service.board("family-1").unwrap();
    assert_eq!(service.import_activities(&outcome.activities).unwrap(), 2);
    let second = service.board("family-1").unwrap();

    assert_eq!(second.entries.len(), 2);
    assert_eq!(second, first);
}

#[test]
fn import_mixing_new_and_stored_ids_replaces_stored_fields_and_votes() {
    let outcome = ingest_json(PAYLOAD).unwrap();
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteActivityRepository::try_new(&mut conn).unwrap();
    let mut service = PlannerService::new(repo);
    service.import_activities(&outcome.activities).unwrap();

    let mut refreshed = outcome.activities[0].clone();
    refreshed.title = "Aquarium and lunch".to_string();
    refreshed.created_at = 999;
    refreshed.clear_vote("mom");
    refreshed.cast_vote("kid", VoteType::No);
    let fresh = Activity::new("family-1", "Night market", 400);

    let imported = service
        .import_activities(&[fresh.clone(), refreshed.clone()])
        .unwrap();
    assert_eq!(imported, 2);

    let board = service.board("family-1").unwrap();
    assert_eq!(board.entries.len(), 3);

    let stored = service.get_activity(refreshed.id).unwrap().unwrap();
    assert_eq!(stored.title, "Aquarium and lunch");
    assert_eq!(stored.created_at, 100);
    assert_eq!(stored.votes.len(), 1);
    assert_eq!(stored.vote_of("kid"), Some(VoteType::No));
    assert!(service.get_activity(fresh.id).unwrap().is_some());
}

#[test]
fn failing_import_leaves_storage_untouched() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteActivityRepository::try_new(&mut conn).unwrap();
    let mut service = PlannerService::new(repo);

    let valid = Activity::new("family-1", "Lighthouse", 100);
    let invalid = Activity::new("family-1", "   ", 200);
    assert!(service.import_activities(&[valid.clone(), invalid]).is_err());

    assert!(service.get_activity(valid.id).unwrap().is_none());
    assert!(service.board("family-1").unwrap().entries.is_empty());
}
