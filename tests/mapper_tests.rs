use mvcore::app::App;
use mvcore::db::{
    combine, combine_by_id, get_ids, Connection, Connector, Document, FindParams, Mapper,
    MapperError, MemoryConnector, MemoryStore, Model, ObjectId, Record, ServerConfig, Store,
    WriteOp, WriteOptions, ID_FIELD,
};
use serde_json::{json, Value};
use std::sync::Arc;

mod common;
use common::models::{AuditEntry, Audited, Product, TenantNote, TENANT};
use common::test_tracing::TestTracing;

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

fn shop() -> (Arc<Connection>, Arc<MemoryStore>) {
    let (connection, store) = Connection::in_memory("shop");
    (Arc::new(connection), store)
}

fn product(name: &str, price: i64) -> Product {
    let mut p = Product::new_record();
    p.set("name", name).set("price", price);
    p
}

#[test]
fn test_sum_of_empty_collection_is_zero() {
    let (connection, _store) = shop();
    let products = Mapper::<Product>::new(connection);
    assert_eq!(products.sum("price", Document::new()).unwrap(), json!(0));
}

#[test]
fn test_sum_with_filter() {
    let (connection, _store) = shop();
    let products = Mapper::<Product>::new(connection);
    for (name, price) in [("pen", 2), ("book", 15), ("lamp", 30)] {
        assert!(products.save(&mut product(name, price), false).unwrap());
    }
    assert_eq!(products.sum("price", Document::new()).unwrap(), json!(47));
    assert_eq!(
        products
            .sum("price", doc(json!({"price": {"$gte": 10}})))
            .unwrap(),
        json!(45)
    );
}

#[test]
fn test_save_inserts_then_updates() {
    let _tracing = TestTracing::init();
    let (connection, store) = shop();
    let products = Mapper::<Product>::new(connection);

    let mut lamp = product("lamp", 30);
    assert!(lamp.id().is_none());
    assert!(products.save(&mut lamp, false).unwrap());
    let id = lamp.id().unwrap();

    lamp.set("price", 25);
    assert!(products.save(&mut lamp, false).unwrap());
    assert_eq!(lamp.id(), Some(id));

    let stored = store.documents("shop", "products");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0][ID_FIELD], id.to_value());
    assert_eq!(stored[0]["price"], json!(25));

    let found = products.find_by_id(id.to_hex()).unwrap().unwrap();
    assert_eq!(found.get("name"), Some(&json!("lamp")));
}

#[test]
fn test_insert_coerces_ids() {
    let (connection, store) = shop();
    let products = Mapper::<Product>::new(connection);
    let hex = "5f43a1b2c3d4e5f6a7b8c9d0";

    let kept = products
        .insert(doc(json!({"_id": hex, "name": "pen"})))
        .unwrap()
        .unwrap();
    assert_eq!(kept.to_hex(), hex);

    let replaced = products
        .insert(doc(json!({"_id": "not-an-id", "name": "cup"})))
        .unwrap()
        .unwrap();
    assert_ne!(replaced.to_hex(), "not-an-id");

    let docs = store.documents("shop", "products");
    assert_eq!(docs[0].keys().next().map(String::as_str), Some(ID_FIELD));
    assert_eq!(docs[0][ID_FIELD], json!({"$oid": hex}));
    assert!(products.find_by_id(hex).unwrap().is_some());
}

#[test]
fn test_find_by_malformed_id_finds_nothing() {
    let (connection, _store) = shop();
    let products = Mapper::<Product>::new(connection);
    assert!(products.find_by_id("nope").unwrap().is_none());
    assert!(products.find_by_id(ObjectId::new().to_hex()).unwrap().is_none());
}

#[test]
fn test_find_sort_skip_limit_and_projection() {
    let (connection, _store) = shop();
    let products = Mapper::<Product>::new(connection);
    for (name, price) in [("pen", 2), ("book", 15), ("lamp", 30), ("desk", 120)] {
        products.save(&mut product(name, price), false).unwrap();
    }

    let page = products
        .find(&FindParams::new().sort_by("price", true).skip(1).limit(2))
        .unwrap();
    let names: Vec<_> = page.iter().map(|p| p.get("name").cloned()).collect();
    assert_eq!(names, vec![Some(json!("lamp")), Some(json!("book"))]);

    let narrow = products
        .find_first(&FindParams::new().eq("name", "desk").projection(["name"]))
        .unwrap()
        .unwrap();
    assert!(narrow.id().is_some());
    assert_eq!(narrow.get("name"), Some(&json!("desk")));
    assert_eq!(narrow.get("price"), None);

    let full = products
        .find_first(&FindParams::new().eq("name", "desk"))
        .unwrap()
        .unwrap();
    assert_eq!(full.get("price"), Some(&json!(120)));
    assert_eq!(products.count(&FindParams::new()).unwrap(), 4);
}

#[test]
fn test_hook_order() {
    let (connection, _store) = shop();
    let audited = Mapper::<Audited>::new(connection);
    Audited::take_log();

    let mut entry = Audited::new_record();
    entry.set("step", 1);
    audited.save(&mut entry, false).unwrap();
    assert_eq!(Audited::take_log(), vec!["before_save", "after_update"]);

    entry.set("step", 2);
    audited.save(&mut entry, false).unwrap();
    assert_eq!(Audited::take_log(), vec!["before_update", "after_save"]);

    assert!(audited.delete(&mut entry).unwrap());
    assert_eq!(Audited::take_log(), vec!["before_delete", "after_delete"]);
}

#[test]
fn test_filter_binds_scope_every_operation() {
    let (connection, store) = shop();
    store
        .bulk_write(
            "shop",
            "notes",
            &[WriteOp::Insert(doc(json!({"tenant": "other", "body": "hidden"})))],
        )
        .unwrap();

    let notes = Mapper::<TenantNote>::new(connection);
    let mut note = TenantNote::new_record();
    note.set("body", "visible");
    assert!(notes.save(&mut note, false).unwrap());

    let stored = store.documents("shop", "notes");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1]["tenant"], json!(TENANT));

    assert_eq!(notes.count(&FindParams::new()).unwrap(), 1);
    let found = notes.find(&FindParams::new()).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("body"), Some(&json!("visible")));

    assert!(notes.delete_raw(Document::new(), 0).unwrap());
    assert_eq!(store.documents("shop", "notes").len(), 1);
    assert_eq!(store.documents("shop", "notes")[0]["tenant"], json!("other"));
}

#[test]
fn test_rejected_writes_return_false() {
    let (connection, store) = shop();
    let products = Mapper::<Product>::new(connection);
    store.set_fail_writes(true);

    let mut pen = product("pen", 2);
    assert!(!products.save(&mut pen, false).unwrap());
    assert!(pen.id().is_none());
    assert!(!products
        .update(Document::new(), doc(json!({"price": 1})), WriteOptions::default())
        .unwrap());
    assert!(products.insert(doc(json!({"name": "cup"}))).unwrap().is_none());

    store.set_fail_writes(false);
    assert!(products.save(&mut pen, false).unwrap());
}

#[test]
fn test_model_database_override() {
    let (connection, store) = shop();
    let entries = Mapper::<AuditEntry>::new(Arc::clone(&connection));
    assert_eq!(entries.database(), "audit");
    assert_eq!(Mapper::<Product>::new(connection).database(), "shop");

    let mut entry = AuditEntry::new_record();
    entry.set("action", "login");
    entries.save(&mut entry, false).unwrap();
    assert_eq!(store.documents("audit", "entries").len(), 1);
    assert!(store.documents("shop", "entries").is_empty());
}

#[test]
fn test_create_indexes_sets_namespace() {
    let (connection, store) = shop();
    let products = Mapper::<Product>::new(connection);
    assert!(products
        .create_indexes(vec![doc(json!({"key": {"name": 1}, "unique": true}))])
        .unwrap());

    let indexes = store.indexes("shop", "products");
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0]["ns"], json!("shop.products"));
    assert_eq!(indexes[0]["name"], json!("name_1"));

    assert!(!products.create_indexes(vec![doc(json!({"unique": true}))]).unwrap());
}

#[test]
fn test_increment_remove_and_rename_columns() {
    let (connection, store) = shop();
    let products = Mapper::<Product>::new(connection);
    products
        .insert(doc(json!({"name": "pen", "views": 1, "tmp": true, "title": "Pen"})))
        .unwrap();
    let pen = doc(json!({"name": "pen"}));

    assert!(products
        .increment(pen.clone(), doc(json!({"views": 2})), WriteOptions::default())
        .unwrap());
    assert!(products
        .remove_columns(pen.clone(), &["tmp"], WriteOptions::default())
        .unwrap());
    assert!(products
        .rename_columns(pen, &[("title", "label")], WriteOptions::default())
        .unwrap());

    let stored = &store.documents("shop", "products")[0];
    assert_eq!(stored["views"], json!(3));
    assert!(!stored.contains_key("tmp"));
    assert!(!stored.contains_key("title"));
    assert_eq!(stored["label"], json!("Pen"));
}

#[test]
fn test_upsert_creates_missing_document() {
    let (connection, store) = shop();
    let products = Mapper::<Product>::new(connection);
    let options = WriteOptions {
        multi: false,
        upsert: true,
    };
    assert!(products
        .update(doc(json!({"name": "mug"})), doc(json!({"price": 8})), options)
        .unwrap());
    let stored = store.documents("shop", "products");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["name"], json!("mug"));
    assert_eq!(stored[0]["price"], json!(8));
}

#[test]
fn test_delete_instance() {
    let (connection, _store) = shop();
    let products = Mapper::<Product>::new(connection);
    let mut never_saved = product("ghost", 0);
    assert!(!products.delete(&mut never_saved).unwrap());

    let mut pen = product("pen", 2);
    products.save(&mut pen, false).unwrap();
    assert!(products.delete(&mut pen).unwrap());
    assert_eq!(products.count(&FindParams::new()).unwrap(), 0);
}

#[test]
fn test_grouping_helpers_over_found_models() {
    let (connection, _store) = shop();
    let products = Mapper::<Product>::new(connection);
    for (name, price) in [("pen", 2), ("pencil", 2), ("lamp", 30)] {
        products.save(&mut product(name, price), false).unwrap();
    }
    let all = products.find(&FindParams::new()).unwrap();
    assert_eq!(get_ids(&all).len(), 3);

    let by_price = combine("price", all);
    assert_eq!(by_price["2"].len(), 2);
    assert_eq!(by_price["30"].len(), 1);

    let by_id = combine_by_id(products.find(&FindParams::new()).unwrap());
    assert_eq!(by_id.len(), 3);
    assert!(by_id.values().all(|p| p.id().is_some()));
}

#[test]
fn test_mapper_from_app_service() {
    let app = App::new();
    assert!(matches!(
        Mapper::<Product>::from_app(&app),
        Err(MapperError::Configuration(_))
    ));

    let (connection, _store) = shop();
    app.set_shared("db", connection);
    let products = Mapper::<Product>::from_app(&app).unwrap();
    assert_eq!(products.database(), "shop");
}

#[test]
fn test_unconfigured_connection() {
    let connector: Arc<dyn Connector> = Arc::new(MemoryConnector::new());
    let nameless = Arc::new(Connection::new(ServerConfig::default(), "", connector));
    let products = Mapper::<Product>::new(nameless);
    match products.count(&FindParams::new()) {
        Err(MapperError::Configuration(msg)) => assert_eq!(msg, "Database not found"),
        other => panic!("expected Configuration, got {other:?}"),
    }
}

#[test]
fn test_connection_is_shared_across_mappers() {
    let store = Arc::new(MemoryStore::new());
    let connector = Arc::new(MemoryConnector::with_store(Arc::clone(&store)));
    let connection = Arc::new(Connection::new(
        ServerConfig::new("db.internal", 27017),
        "shop",
        Arc::clone(&connector) as Arc<dyn Connector>,
    ));
    assert!(!connection.is_connected());

    let products = Mapper::<Product>::new(Arc::clone(&connection));
    let notes = Mapper::<TenantNote>::new(Arc::clone(&connection));
    products.count(&FindParams::new()).unwrap();
    notes.count(&FindParams::new()).unwrap();

    assert!(connection.is_connected());
    assert_eq!(connector.connects(), 1);
}

#[test]
fn test_record_round_trip_through_plain() {
    let (connection, _store) = shop();
    let products = Mapper::<Product>::new(connection);
    let mut lamp = product("lamp", 30);
    products.save(&mut lamp, false).unwrap();

    let plain = lamp.to_plain();
    assert_eq!(plain["_id"], json!(lamp.id().unwrap().to_hex()));
    let record = Record::from_document(lamp.record().fields().clone());
    assert_eq!(record.id(), lamp.id());
}
