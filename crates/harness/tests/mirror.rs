use findprice_core::{
    CategoryKind, Collection, FieldValue, Key, Product, ProductType, QuantityType, category_value,
};
use findprice_engine::{Catalog, LiveCollection, decode_snapshot};
use findprice_harness::TestNetwork;
use findprice_storage::{Snapshot, SqliteStore, Store};

#[test]
fn quantity_types_follow_pushed_snapshots() -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open_in_memory()?;
    let mirror = LiveCollection::<QuantityType>::attach(&store)?;
    assert!(mirror.is_loaded());
    assert!(mirror.items().is_empty());

    let k1 = Key::parse("k1")?;
    let path = Collection::QuantityTypes.document(&k1);
    store.write_at(&path, &category_value("Litre"))?;
    assert_eq!(
        mirror.items().to_vec(),
        vec![QuantityType { id: k1.clone(), name: "Litre".into() }]
    );

    // Removing the last entry leaves nothing under the collection.
    store.delete_at(&path)?;
    assert!(mirror.items().is_empty());
    assert_eq!(mirror.get(&k1), None);
    assert_eq!(mirror.revision(), 3);
    Ok(())
}

#[test]
fn writes_elsewhere_do_not_touch_the_mirror() -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open_in_memory()?;
    let mirror = LiveCollection::<ProductType>::attach(&store)?;
    let before = mirror.revision();

    let path = store.generate_key(&Collection::QuantityTypes.path())?;
    store.write_at(&path, &category_value("Kg"))?;
    assert_eq!(mirror.revision(), before);
    assert!(mirror.items().is_empty());
    Ok(())
}

#[test]
fn undecodable_records_are_left_out() -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open_in_memory()?;
    let mirror = LiveCollection::<Product>::attach(&store)?;

    let good = store.generate_key(&Collection::Products.path())?;
    let bad = store.generate_key(&Collection::Products.path())?;
    store.write_at(&good, &FieldValue::map([("name", FieldValue::from("Ghee"))]))?;
    store.write_at(&bad, &FieldValue::from("not a product"))?;

    let items = mirror.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Ghee");
    assert_eq!(items[0].product_id, None);
    Ok(())
}

#[test]
fn closed_mirror_releases_its_subscription() -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open_in_memory()?;
    let mirror = LiveCollection::<ProductType>::attach(&store)?;
    let dropped = LiveCollection::<QuantityType>::attach(&store)?;
    assert_eq!(store.subscription_count()?, 2);

    mirror.close();
    drop(dropped);
    assert_eq!(store.subscription_count()?, 0);

    let path = store.generate_key(&Collection::ProductTypes.path())?;
    store.write_at(&path, &category_value("Dairy"))?;
    Ok(())
}

#[test]
fn clients_see_each_others_writes() -> Result<(), Box<dyn std::error::Error>> {
    let mut network = TestNetwork::new()?;
    let a = network.add_client()?;
    let b = network.add_client()?;

    network.client(a).seed_category(CategoryKind::ProductType, "Dairy")?;
    let curd = network.client(b).seed_product(Some("C-1"), "Curd", "Dairy", "Kg", 80.0)?;

    assert_eq!(network.client(b).category_names(CategoryKind::ProductType), vec!["Dairy"]);
    assert_eq!(network.client(a).catalog.product(&curd.id), Some(curd));
    assert_eq!(network.store().subscription_count()?, 6);

    network.remove_client(a);
    assert_eq!(network.store().subscription_count()?, 3);
    Ok(())
}

#[test]
fn on_disk_catalog_survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let mut network = TestNetwork::on_disk()?;
    let a = network.add_client()?;
    let milk = network.client(a).seed_product(None, "Milk", "Dairy", "Litre", 62.0)?;
    let file = network.database_file().ok_or("network has no database file")?;

    let reopened = Catalog::attach(SqliteStore::open(&file)?)?;
    assert_eq!(reopened.product(&milk.id), Some(milk));
    Ok(())
}

#[test]
fn concurrent_writers_leave_the_mirror_on_the_latest_state() -> Result<(), Box<dyn std::error::Error>> {
    for _ in 0..50 {
        let store = SqliteStore::open_in_memory()?;
        let mirror = LiveCollection::<Product>::attach(&store)?;

        std::thread::scope(|scope| {
            for writer in 0..4 {
                let handle = store.clone();
                scope.spawn(move || {
                    let path = Collection::Products.document(&Key::parse(format!("t{writer}")).unwrap());
                    for round in 0..20 {
                        let value = FieldValue::map([("name", FieldValue::from(format!("{writer}-{round}")))]);
                        handle.write_at(&path, &value).unwrap();
                    }
                });
            }
        });

        let collection = Collection::Products.path();
        let stored = decode_snapshot::<Product>(&Snapshot {
            path: collection.clone(),
            value: store.value_at(&collection)?,
            sequence: 0,
        });
        let mut mirrored = mirror.items().to_vec();
        mirrored.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(mirrored, stored);
        assert!(mirrored.iter().all(|p| p.name.ends_with("-19")));
    }
    Ok(())
}
