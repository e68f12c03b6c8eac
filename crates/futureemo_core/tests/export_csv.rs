use futureemo_core::db::open_db_in_memory;
use futureemo_core::{
    export_labels_csv, ExportError, Item, ItemId, ItemRepository, LabelService, ReviewService,
    SqliteItemRepository, SqliteLabelRepository, SubmitLabelRequest,
};
use rusqlite::Connection;

fn review(conn: &Connection) -> ReviewService<SqliteItemRepository<'_>, SqliteLabelRepository<'_>> {
    ReviewService::new(
        SqliteItemRepository::try_new(conn).unwrap(),
        SqliteLabelRepository::try_new(conn).unwrap(),
    )
}

fn create(conn: &Connection, text: &str) -> ItemId {
    SqliteItemRepository::try_new(conn)
        .unwrap()
        .create_item(&Item::new(text))
        .unwrap()
}

fn submit(conn: &Connection, item_id: ItemId, annotator: &str, value: &str) {
    LabelService::new(SqliteLabelRepository::try_new(conn).unwrap())
        .submit_label_at(
            &SubmitLabelRequest {
                item_id: item_id.to_string(),
                annotator_name: annotator.to_string(),
                value: value.to_string(),
            },
            1_000,
        )
        .unwrap();
}

#[test]
fn store_without_labels_has_nothing_to_export() {
    let conn = open_db_in_memory().unwrap();
    create(&conn, "never labeled");

    let err = export_labels_csv(&review(&conn)).unwrap_err();
    assert!(matches!(err, ExportError::NothingToExport));
}

#[test]
fn skip_only_items_are_not_exported() {
    let conn = open_db_in_memory().unwrap();
    let item_id = create(&conn, "abstained");
    submit(&conn, item_id, "alice", "Skip");

    let err = export_labels_csv(&review(&conn)).unwrap_err();
    assert!(matches!(err, ExportError::NothingToExport));
}

#[test]
fn report_has_one_row_per_labeled_item() {
    let conn = open_db_in_memory().unwrap();
    let pair = create(&conn, "hope, mostly");
    let single = create(&conn, "she said \"go\"");
    create(&conn, "untouched");

    submit(&conn, pair, "bob", "Hope");
    submit(&conn, pair, "alice", "Hope");
    submit(&conn, pair, "carol", "Skip");
    submit(&conn, single, "alice", "Fear");

    let report = export_labels_csv(&review(&conn)).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "Item ID,Item Text,Majority Label,Resolved Label,Status,Total Labels,\
         alice's Label,bob's Label,carol's Label,Agreement %,Fleiss Kappa"
    );
    assert_eq!(
        lines[1],
        format!("{single},\"she said \"\"go\"\"\",Fear,Not Set,open,1,Fear,,,100%,N/A")
    );
    assert_eq!(
        lines[2],
        format!("{pair},\"hope, mostly\",Hope,Hope,resolved,3,Hope,Hope,Skip,100%,1.000")
    );
}

#[test]
fn split_pair_reports_negative_kappa_and_no_resolved_label() {
    let conn = open_db_in_memory().unwrap();
    let item_id = create(&conn, "torn");
    submit(&conn, item_id, "alice", "Determination");
    submit(&conn, item_id, "bob", "Fear");

    let report = export_labels_csv(&review(&conn)).unwrap();
    let row = report.lines().nth(1).unwrap();
    assert_eq!(
        row,
        format!("{item_id},torn,Fear,Not Set,open,2,Determination,Fear,50%,-1.000")
    );
}
