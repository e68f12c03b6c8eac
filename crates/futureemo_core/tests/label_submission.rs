use futureemo_core::db::{open_db, open_db_in_memory};
use futureemo_core::{
    Category, Consensus, Item, ItemId, ItemRepository, ItemStatus, LabelRepository, LabelService,
    LabelServiceError, RepoError, SqliteItemRepository, SqliteLabelRepository, SubmitLabelRequest,
    ValidationError,
};
use rusqlite::Connection;
use std::sync::{Arc, Barrier};
use std::thread;

fn seed_item(conn: &Connection, text: &str) -> ItemId {
    SqliteItemRepository::try_new(conn)
        .unwrap()
        .create_item(&Item::new(text))
        .unwrap()
}

fn request(item_id: ItemId, annotator: &str, value: &str) -> SubmitLabelRequest {
    SubmitLabelRequest {
        item_id: item_id.to_string(),
        annotator_name: annotator.to_string(),
        value: value.to_string(),
    }
}

fn submit_all(conn: &Connection, item_id: ItemId, labels: &[(&str, &str)]) {
    let service = LabelService::new(SqliteLabelRepository::try_new(conn).unwrap());
    for (offset, (annotator, value)) in labels.iter().enumerate() {
        service
            .submit_label_at(&request(item_id, annotator, value), 1_000 * offset as i64)
            .unwrap();
        assert_item_invariants(conn, item_id);
    }
}

fn load(conn: &Connection, item_id: ItemId) -> Item {
    SqliteItemRepository::try_new(conn)
        .unwrap()
        .get_item(item_id)
        .unwrap()
        .unwrap()
}

fn assert_item_invariants(conn: &Connection, item_id: ItemId) {
    let item = load(conn, item_id);
    let substantive: u32 = conn
        .query_row(
            "SELECT COUNT(*) FROM labels WHERE item_uuid = ?1 AND value <> 'Skip';",
            [item_id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(item.label_count, substantive);
    assert_eq!(
        item.status() == ItemStatus::Resolved,
        item.resolved_label().is_some()
    );
}

#[test]
fn two_matching_labels_resolve_the_item() {
    let conn = open_db_in_memory().unwrap();
    let item_id = seed_item(&conn, "we will make it");
    let service = LabelService::new(SqliteLabelRepository::try_new(&conn).unwrap());

    let first = service
        .submit_label_at(&request(item_id, "alice", "Hope"), 1_000)
        .unwrap();
    assert_eq!(first.status, ItemStatus::Open);
    assert_eq!(first.resolved_label, None);
    assert_eq!(first.label_count, 1);

    let second = service
        .submit_label_at(&request(item_id, "bob", "Hope"), 2_000)
        .unwrap();
    assert_eq!(second.status, ItemStatus::Resolved);
    assert_eq!(second.resolved_label, Some(Category::Hope));
    assert_eq!(second.label_count, 2);
}

#[test]
fn split_pair_stays_open() {
    let conn = open_db_in_memory().unwrap();
    let item_id = seed_item(&conn, "it could go either way");
    submit_all(&conn, item_id, &[("alice", "Hope"), ("bob", "Fear")]);

    let item = load(&conn, item_id);
    assert_eq!(item.consensus, Consensus::Open);
    assert_eq!(item.label_count, 2);
}

#[test]
fn third_label_breaks_a_split_pair() {
    let conn = open_db_in_memory().unwrap();
    let item_id = seed_item(&conn, "tomorrow is ours");
    submit_all(
        &conn,
        item_id,
        &[("alice", "Hope"), ("bob", "Fear"), ("carol", "Hope")],
    );

    assert_eq!(
        load(&conn, item_id).consensus,
        Consensus::Resolved(Category::Hope)
    );
}

#[test]
fn three_way_split_needs_review() {
    let conn = open_db_in_memory().unwrap();
    let item_id = seed_item(&conn, "no idea what comes next");
    submit_all(
        &conn,
        item_id,
        &[("alice", "Hope"), ("bob", "Fear"), ("carol", "Neutral")],
    );

    let item = load(&conn, item_id);
    assert_eq!(item.consensus, Consensus::NeedsReview);
    assert_eq!(item.label_count, 3);
}

#[test]
fn resolved_item_is_recomputed_on_later_labels() {
    let conn = open_db_in_memory().unwrap();
    let item_id = seed_item(&conn, "keep going");
    submit_all(
        &conn,
        item_id,
        &[
            ("alice", "Determination"),
            ("bob", "Determination"),
            ("carol", "Fear"),
            ("dave", "Fear"),
        ],
    );

    let item = load(&conn, item_id);
    assert_eq!(item.consensus, Consensus::NeedsReview);
    assert_eq!(item.label_count, 4);
}

#[test]
fn skip_is_recorded_without_touching_consensus() {
    let conn = open_db_in_memory().unwrap();
    let item_id = seed_item(&conn, "skip me");
    submit_all(&conn, item_id, &[("alice", "Hope"), ("bob", "Hope")]);

    let service = LabelService::new(SqliteLabelRepository::try_new(&conn).unwrap());
    let receipt = service
        .submit_label_at(&request(item_id, "carol", "Skip"), 5_000)
        .unwrap();
    assert_eq!(receipt.status, ItemStatus::Resolved);
    assert_eq!(receipt.resolved_label, Some(Category::Hope));
    assert_eq!(receipt.label_count, 2);

    let labels = SqliteLabelRepository::try_new(&conn)
        .unwrap()
        .count_labels()
        .unwrap();
    assert_eq!(labels, 3);
    assert_item_invariants(&conn, item_id);
}

#[test]
fn skip_only_item_stays_fresh() {
    let conn = open_db_in_memory().unwrap();
    let item_id = seed_item(&conn, "nobody knows");
    submit_all(&conn, item_id, &[("alice", "Skip"), ("bob", "Skip")]);

    let item = load(&conn, item_id);
    assert_eq!(item.consensus, Consensus::Open);
    assert_eq!(item.label_count, 0);
}

#[test]
fn second_submission_from_same_annotator_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let item_id = seed_item(&conn, "once only");
    let service = LabelService::new(SqliteLabelRepository::try_new(&conn).unwrap());

    service
        .submit_label_at(&request(item_id, "alice", "Skip"), 1_000)
        .unwrap();
    let err = service
        .submit_label_at(&request(item_id, " alice ", "Hope"), 2_000)
        .unwrap_err();
    assert!(matches!(
        err,
        LabelServiceError::DuplicateSubmission { item_id: id } if id == item_id
    ));

    let item = load(&conn, item_id);
    assert_eq!(item.label_count, 0);
    assert_eq!(item.consensus, Consensus::Open);
}

#[test]
fn unknown_item_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let missing = ItemId::new_v4();
    let service = LabelService::new(SqliteLabelRepository::try_new(&conn).unwrap());

    let err = service
        .submit_label_at(&request(missing, "alice", "Hope"), 1_000)
        .unwrap_err();
    assert!(matches!(err, LabelServiceError::ItemNotFound(id) if id == missing));
    assert_eq!(
        SqliteLabelRepository::try_new(&conn)
            .unwrap()
            .count_labels()
            .unwrap(),
        0
    );
}

#[test]
fn invalid_input_is_rejected_before_any_write() {
    let conn = open_db_in_memory().unwrap();
    let item_id = seed_item(&conn, "validate me");
    let service = LabelService::new(SqliteLabelRepository::try_new(&conn).unwrap());

    let err = service
        .submit_label_at(&request(item_id, "alice", "hope"), 1_000)
        .unwrap_err();
    assert!(matches!(
        err,
        LabelServiceError::Validation(ValidationError::UnknownLabel(_))
    ));

    let err = service
        .submit_label_at(&request(item_id, "   ", "Hope"), 1_000)
        .unwrap_err();
    assert!(matches!(
        err,
        LabelServiceError::Validation(ValidationError::EmptyAnnotatorName)
    ));

    let bad_id = SubmitLabelRequest {
        item_id: "not-a-uuid".to_string(),
        annotator_name: "alice".to_string(),
        value: "Hope".to_string(),
    };
    let err = service.submit_label_at(&bad_id, 1_000).unwrap_err();
    assert!(matches!(
        err,
        LabelServiceError::Validation(ValidationError::MalformedItemId(_))
    ));

    assert_eq!(
        SqliteLabelRepository::try_new(&conn)
            .unwrap()
            .count_labels()
            .unwrap(),
        0
    );
}

#[test]
fn custom_resolver_output_is_persisted() {
    let conn = open_db_in_memory().unwrap();
    let item_id = seed_item(&conn, "forced outcome");
    let repo = SqliteLabelRepository::try_new(&conn).unwrap();

    let label = futureemo_core::Label::new(
        item_id,
        "alice",
        futureemo_core::LabelValue::Category(Category::Fear),
        1_000,
    );
    let item = repo
        .append_label(&label, |history| {
            assert_eq!(history, [Category::Fear]);
            Consensus::NeedsReview
        })
        .unwrap();
    assert_eq!(item.consensus, Consensus::NeedsReview);
    assert_eq!(item.label_count, 1);
}

#[test]
fn repository_reports_duplicate_label() {
    let conn = open_db_in_memory().unwrap();
    let item_id = seed_item(&conn, "repo level");
    let repo = SqliteLabelRepository::try_new(&conn).unwrap();
    let value = futureemo_core::LabelValue::Category(Category::Hope);

    repo.append_label(
        &futureemo_core::Label::new(item_id, "alice", value, 1),
        futureemo_core::resolve,
    )
    .unwrap();
    let err = repo
        .append_label(
            &futureemo_core::Label::new(item_id, "alice", value, 2),
            futureemo_core::resolve,
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateLabel { .. }));
}

#[test]
fn concurrent_duplicate_submissions_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");
    let setup = open_db(&path).unwrap();
    let item_id = seed_item(&setup, "race condition");
    drop(setup);

    let connections = [open_db(&path).unwrap(), open_db(&path).unwrap()];
    let barrier = Arc::new(Barrier::new(connections.len()));
    let handles: Vec<_> = connections
        .into_iter()
        .enumerate()
        .map(|(index, conn)| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let service = LabelService::new(SqliteLabelRepository::try_new(&conn).unwrap());
                let value = if index == 0 { "Hope" } else { "Fear" };
                barrier.wait();
                service
                    .submit_label_at(&request(item_id, "alice", value), 1_000)
                    .map(|_| ())
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    let accepted = results.iter().filter(|result| result.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|result| matches!(result, Err(LabelServiceError::DuplicateSubmission { .. })))
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(duplicates, 1);

    let conn = open_db(&path).unwrap();
    assert_eq!(load(&conn, item_id).label_count, 1);
    assert_item_invariants(&conn, item_id);
}

#[test]
fn concurrent_submissions_from_different_annotators_both_apply() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");
    let setup = open_db(&path).unwrap();
    let item_id = seed_item(&setup, "both count");
    drop(setup);

    let connections = [open_db(&path).unwrap(), open_db(&path).unwrap()];
    let barrier = Arc::new(Barrier::new(connections.len()));
    let handles: Vec<_> = connections
        .into_iter()
        .zip(["alice", "bob"])
        .map(|(conn, annotator)| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let service = LabelService::new(SqliteLabelRepository::try_new(&conn).unwrap());
                barrier.wait();
                service
                    .submit_label_at(&request(item_id, annotator, "Neutral"), 1_000)
                    .map(|_| ())
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let conn = open_db(&path).unwrap();
    let item = load(&conn, item_id);
    assert_eq!(item.label_count, 2);
    assert_eq!(item.consensus, Consensus::Resolved(Category::Neutral));
}
