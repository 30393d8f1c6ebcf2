mod common;

use assert_matches::assert_matches;
use common::{TitleCommitter, TripStore};
use std::sync::Arc;
use trip_shared::{
    EditError, EditModeStore, FieldId, FieldSet, ItemId, MemoryKv, Paginator, RejectReason,
    TripId, TripPatch, TripQuery,
};

fn title_field(trip: &str) -> FieldId {
    FieldId::new(format!("{trip}.title"))
}

#[tokio::test]
async fn committed_title_reaches_store_and_list() {
    let store = TripStore::with_trips("u1", 3);
    let paginator: Paginator<trip_shared::Trip> = Paginator::default();
    paginator.load_first_page(&store, &TripQuery::for_owner("u1")).await;

    let field = title_field("u1-trip-1");
    let fields = FieldSet::new().with_field(field.clone(), "Trip 1".to_string());
    let committer = TitleCommitter { store: &store, reject: false };

    let committed = fields
        .attempt_edit(&field, "Lisbon in spring".to_string(), &committer)
        .await
        .unwrap();
    assert!(committed.changed);
    paginator.update_item(&ItemId::new("u1-trip-1"), TripPatch::title(committed.value));

    assert_eq!(store.get(&TripId::new("u1-trip-1")).unwrap().title, "Lisbon in spring");
    assert_eq!(
        paginator.find(&ItemId::new("u1-trip-1")).unwrap().title,
        "Lisbon in spring"
    );
    assert_eq!(fields.committed(&field).as_deref(), Some("Lisbon in spring"));
    assert!(!fields.is_saving(&field));
}

#[tokio::test]
async fn rejected_title_rolls_back() {
    let store = TripStore::with_trips("u1", 1);
    let field = title_field("u1-trip-0");
    let fields = FieldSet::new().with_field(field.clone(), "Trip 0".to_string());
    fields.set_editing(&field, true);
    let committer = TitleCommitter { store: &store, reject: true };

    let rejected = fields
        .attempt_edit(&field, "Nowhere".to_string(), &committer)
        .await
        .unwrap_err();

    assert_matches!(rejected.reason, RejectReason::CommitFailed(EditError::Remote(_)));
    assert_eq!(rejected.current.as_deref(), Some("Trip 0"));
    assert_eq!(fields.value(&field).as_deref(), Some("Trip 0"));
    assert!(fields.is_editing(&field));
    assert_eq!(store.get(&TripId::new("u1-trip-0")).unwrap().title, "Trip 0");
}

#[tokio::test]
async fn unchanged_title_skips_commit() {
    let store = TripStore::with_trips("u1", 1);
    let field = title_field("missing-trip");
    let fields = FieldSet::new().with_field(field.clone(), "Same".to_string());
    // Would fail if the commit ran: the trip does not exist.
    let committer = TitleCommitter { store: &store, reject: false };

    let committed = fields
        .attempt_edit(&field, "Same".to_string(), &committer)
        .await
        .unwrap();

    assert!(!committed.changed);
}

#[tokio::test]
async fn blank_title_fails_validation() {
    let store = TripStore::with_trips("u1", 1);
    let field = title_field("u1-trip-0");
    let fields = FieldSet::new()
        .with_field(field.clone(), "Trip 0".to_string())
        .with_validator(field.clone(), |v: &String| {
            if v.trim().is_empty() {
                Err("title is required".to_string())
            } else {
                Ok(())
            }
        });
    let committer = TitleCommitter { store: &store, reject: false };

    let rejected = fields
        .attempt_edit(&field, "   ".to_string(), &committer)
        .await
        .unwrap_err();

    assert_matches!(rejected.reason, RejectReason::Invalid(_));
    assert_eq!(store.get(&TripId::new("u1-trip-0")).unwrap().title, "Trip 0");
}

#[tokio::test]
async fn edit_mode_toggles_in_memory() {
    let modes = EditModeStore::new(Arc::new(MemoryKv::new()));

    assert!(!modes.is_editing("trip-detail").await.unwrap());
    assert!(modes.toggle("trip-detail").await.unwrap());
    assert!(modes.is_editing("trip-detail").await.unwrap());
    assert!(!modes.is_editing("trip-list").await.unwrap());
}

#[cfg(all(feature = "sqlite", not(target_arch = "wasm32")))]
#[tokio::test]
async fn edit_mode_survives_reopen() {
    use trip_shared::SqliteKv;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.db");

    {
        let modes = EditModeStore::new(Arc::new(SqliteKv::open(&path).unwrap()));
        modes.set_editing("trip-detail", true).await.unwrap();
    }

    let modes = EditModeStore::new(Arc::new(SqliteKv::open(&path).unwrap()));
    assert!(modes.is_editing("trip-detail").await.unwrap());
    assert!(!modes.toggle("trip-detail").await.unwrap());
}
