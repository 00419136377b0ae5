#![forbid(unsafe_code)]

use census_core::ids::RegistrantId;
use census_storage::{
    CancelToken, CensusError, CreateRegistrantRequest, CropCount, ReplaceRegistrantRequest,
    SqliteStore, SyncStep,
};
use rusqlite::Connection;
use serde_json::{Value, json};
use std::collections::BTreeSet;

fn payload(ci: &str, crops: &[&str]) -> Value {
    json!({
        "name": "Carmen",
        "lastName": "Yupanqui",
        "ci": ci,
        "dateOfBirth": "1979-11-04",
        "hasRuc": true,
        "rucNumber": format!("{ci}001"),
        "gender": "female",
        "hasFarm": !crops.is_empty(),
        "farmHa": 3.5,
        "farmName": "San Isidro",
        "crops": crops,
        "hasWorkers": true,
        "totalWorkers": 3,
        "menWorkers": 1,
        "womanWorkers": 2,
        "over18Workers": 3,
        "under18Workers": 0,
        "hasPregnantWorkers": true,
        "pregnantWorkers": 1,
        "pregnantWorkersOccupation": "sorting",
        "family": [
            { "name": "Jose", "lastName": "Yupanqui", "ci": "0600000001" },
            { "name": "Lucia", "lastName": "Yupanqui", "ci": "0600000002" }
        ]
    })
}

fn create(store: &mut SqliteStore, payload: Value) -> RegistrantId {
    store
        .create_registrant(CreateRegistrantRequest::new(payload))
        .expect("create registrant")
}

fn crop_set(store: &SqliteStore, id: RegistrantId) -> BTreeSet<String> {
    store
        .get_registrant(id)
        .expect("get registrant")
        .registrant
        .crops
        .into_iter()
        .collect()
}

fn poison_crops(db_path: &std::path::Path) {
    let conn = Connection::open(db_path).expect("open db");
    conn.execute_batch(
        "CREATE TRIGGER reject_poison BEFORE INSERT ON crops \
         WHEN NEW.crop_name = 'poison' \
         BEGIN SELECT RAISE(ABORT, 'poison crop'); END;",
    )
    .expect("install trigger");
}

#[test]
fn created_registrant_lists_back_normalized() {
    let mut store = SqliteStore::open_in_memory().expect("open store");
    let id = create(&mut store, payload("0912345678", &["cacao", "banana", "cacao"]));

    let listed = store.list_registrants().expect("list");
    assert_eq!(listed.len(), 1);
    let detail = &listed[0];
    assert_eq!(detail.id, id);
    assert_eq!(detail.registrant.ci, "0912345678");
    assert_eq!(detail.registrant.ruc_number.as_deref(), Some("0912345678001"));
    assert_eq!(detail.registrant.farm_ha, Some(3.5));
    assert_eq!(detail.registrant.total_workers, Some(3));
    assert_eq!(detail.registrant.pregnant_workers, Some(1));
    assert_eq!(detail.registrant.family.len(), 2);
    assert_eq!(
        crop_set(&store, id),
        BTreeSet::from(["banana".to_string(), "cacao".to_string()])
    );
    assert_eq!(detail.created_at_ms, detail.updated_at_ms);
}

#[test]
fn farmless_registrant_stores_no_crops() {
    let mut store = SqliteStore::open_in_memory().expect("open store");
    let mut body = payload("0912345678", &[]);
    body["crops"] = json!(["ignored"]);
    let id = create(&mut store, body);

    let detail = store.get_registrant(id).expect("get");
    assert!(!detail.registrant.has_farm);
    assert!(detail.registrant.crops.is_empty());
    assert_eq!(detail.registrant.farm_name, None);
    assert!(store.crop_summary().expect("summary").is_empty());
}

#[test]
fn invalid_payload_writes_nothing() {
    let mut store = SqliteStore::open_in_memory().expect("open store");
    let mut body = payload("0912345678", &["cacao"]);
    body["family"] = json!([]);

    let err = store
        .create_registrant(CreateRegistrantRequest::new(body))
        .expect_err("empty family");
    match err {
        CensusError::Validation(err) => assert!(err.violations().contains("family")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(store.list_registrants().expect("list").is_empty());
}

#[test]
fn replace_swaps_disjoint_crops_without_leftovers() {
    let mut store = SqliteStore::open_in_memory().expect("open store");
    let id = create(&mut store, payload("0912345678", &["cacao", "coffee"]));

    let mut next = payload("0912345678", &["maize", "quinoa"]);
    next["family"] = json!([{ "name": "Pedro", "lastName": "Yupanqui", "ci": "0600000009" }]);
    store
        .replace_registrant(ReplaceRegistrantRequest::new(id, next))
        .expect("replace");

    let detail = store.get_registrant(id).expect("get");
    assert_eq!(
        crop_set(&store, id),
        BTreeSet::from(["maize".to_string(), "quinoa".to_string()])
    );
    assert_eq!(detail.registrant.family.len(), 1);
    assert_eq!(detail.registrant.family[0].name, "Pedro");
    assert!(detail.updated_at_ms >= detail.created_at_ms);

    let summary = store.crop_summary().expect("summary");
    assert_eq!(summary.len(), 2);
    assert!(summary.iter().all(|crop| crop.count == 1));
}

#[test]
fn replace_and_delete_of_unknown_ids_are_not_found() {
    let mut store = SqliteStore::open_in_memory().expect("open store");
    let missing = RegistrantId::try_new(404).expect("id");

    let err = store
        .replace_registrant(ReplaceRegistrantRequest::new(
            missing,
            payload("0912345678", &[]),
        ))
        .expect_err("replace missing");
    assert_eq!(err.code(), "NOT_FOUND");

    let err = store.delete_registrant(missing).expect_err("delete missing");
    assert!(matches!(err, CensusError::NotFound(id) if id == missing));

    let err = store.get_registrant(missing).expect_err("get missing");
    assert_eq!(err.code(), "NOT_FOUND");
}

#[test]
fn delete_cascades_to_children() {
    let mut store = SqliteStore::open_in_memory().expect("open store");
    let gone = create(&mut store, payload("0912345678", &["cacao"]));
    let kept = create(&mut store, payload("0987654321", &["cacao", "rice"]));

    store.delete_registrant(gone).expect("delete");

    let listed = store.list_registrants().expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, kept);
    assert_eq!(
        store.crop_summary().expect("summary"),
        vec![
            CropCount {
                crop_name: "cacao".to_string(),
                count: 1
            },
            CropCount {
                crop_name: "rice".to_string(),
                count: 1
            },
        ]
    );
}

#[test]
fn duplicate_ci_fails_at_the_root_insert() {
    let mut store = SqliteStore::open_in_memory().expect("open store");
    create(&mut store, payload("0912345678", &["cacao"]));

    let err = store
        .create_registrant(CreateRegistrantRequest::new(payload(
            "0912345678",
            &["rice"],
        )))
        .expect_err("duplicate ci");
    assert_eq!(err.code(), "PERSISTENCE");
    assert_eq!(err.step(), Some(SyncStep::InsertRegistrant));

    assert_eq!(store.list_registrants().expect("list").len(), 1);
    let summary = store.crop_summary().expect("summary");
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].crop_name, "cacao");
}

#[test]
fn failed_crop_insert_rolls_back_the_whole_create() {
    let dir = tempfile::tempdir().expect("temp dir");
    {
        SqliteStore::open(dir.path()).expect("install schema");
    }
    poison_crops(&dir.path().join("census.db"));

    let mut store = SqliteStore::open(dir.path()).expect("reopen");
    let err = store
        .create_registrant(CreateRegistrantRequest::new(payload(
            "0912345678",
            &["cacao", "poison"],
        )))
        .expect_err("trigger rejects crop");
    assert_eq!(err.step(), Some(SyncStep::InsertCrops));
    assert!(store.list_registrants().expect("list").is_empty());
}

#[test]
fn failed_replace_keeps_the_previous_children() {
    let dir = tempfile::tempdir().expect("temp dir");
    let id = {
        let mut store = SqliteStore::open(dir.path()).expect("open");
        create(&mut store, payload("0912345678", &["cacao"]))
    };
    poison_crops(&dir.path().join("census.db"));

    let mut store = SqliteStore::open(dir.path()).expect("reopen");
    let mut next = payload("0912345678", &["poison"]);
    next["name"] = json!("Changed");
    let err = store
        .replace_registrant(ReplaceRegistrantRequest::new(id, next))
        .expect_err("trigger rejects crop");
    assert_eq!(err.code(), "PERSISTENCE");

    let detail = store.get_registrant(id).expect("get");
    assert_eq!(detail.registrant.name, "Carmen");
    assert_eq!(detail.registrant.crops, vec!["cacao".to_string()]);
    assert_eq!(detail.registrant.family.len(), 2);
}

#[test]
fn cancelled_create_leaves_no_rows() {
    let mut store = SqliteStore::open_in_memory().expect("open store");
    let token = CancelToken::new();
    token.cancel();

    let mut request = CreateRegistrantRequest::new(payload("0912345678", &["cacao"]));
    request.cancel = Some(token);
    let err = store.create_registrant(request).expect_err("cancelled");
    assert!(matches!(
        err,
        CensusError::Cancelled {
            step: SyncStep::InsertRegistrant
        }
    ));
    assert!(store.list_registrants().expect("list").is_empty());
}

#[test]
fn records_survive_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let id = {
        let mut store = SqliteStore::open(dir.path()).expect("open");
        assert_eq!(store.storage_dir(), Some(dir.path()));
        create(&mut store, payload("0912345678", &["cacao"]))
    };

    let store = SqliteStore::open(dir.path()).expect("reopen");
    let detail = store.get_registrant(id).expect("get");
    assert_eq!(detail.registrant.last_name, "Yupanqui");
    assert_eq!(
        detail.registrant.date_of_birth,
        time::macros::date!(1979 - 11 - 04)
    );
}

#[test]
fn foreign_databases_require_a_reset() {
    let dir = tempfile::tempdir().expect("temp dir");
    {
        let conn = Connection::open(dir.path().join("census.db")).expect("open db");
        conn.execute_batch("CREATE TABLE workspaces(workspace TEXT PRIMARY KEY)")
            .expect("foreign table");
    }
    let err = SqliteStore::open(dir.path()).expect_err("foreign schema");
    assert_eq!(err.code(), "RESET_REQUIRED");
}
