use std::sync::Arc;

use findprice_core::validation::RateTier;
use findprice_core::{CategoryKind, Collection, Document};
use findprice_engine::{Catalog, CatalogConfig, EngineError, Notice};
use findprice_harness::{JournalEntry, TestClient, TestNetwork};
use findprice_storage::Store;

fn visible_names<S: Store>(catalog: &mut Catalog<S>) -> Vec<String> {
    catalog.visible_products().iter().map(|p| p.name.clone()).collect()
}

#[test]
fn search_covers_every_field_and_keeps_order() -> Result<(), Box<dyn std::error::Error>> {
    let mut client = TestClient::new()?;
    client.seed_product(Some("D-2"), "Buttermilk", "Dairy", "Litre", 25.0)?;
    client.seed_product(None, "Honey", "Sweets", "Jar", 310.0)?;
    client.seed_product(Some("d-1"), "Whole Milk", "Dairy", "Litre", 62.5)?;

    assert_eq!(visible_names(&mut client.catalog), vec!["Whole Milk", "Buttermilk", "Honey"]);

    client.catalog.set_query("  milk ");
    assert_eq!(visible_names(&mut client.catalog), vec!["Whole Milk", "Buttermilk"]);

    client.catalog.set_query("62.5");
    assert_eq!(visible_names(&mut client.catalog), vec!["Whole Milk"]);

    client.catalog.set_query("JAR");
    assert_eq!(visible_names(&mut client.catalog), vec!["Honey"]);

    client.catalog.set_query("undefined");
    assert!(visible_names(&mut client.catalog).is_empty());

    client.catalog.clear_query();
    assert_eq!(client.catalog.query(), "");
    assert_eq!(visible_names(&mut client.catalog).len(), 3);
    Ok(())
}

#[test]
fn view_is_recomputed_only_when_inputs_change() -> Result<(), Box<dyn std::error::Error>> {
    let mut network = TestNetwork::new()?;
    let a = network.add_client()?;
    let b = network.add_client()?;
    network.client(a).seed_product(Some("1"), "Curd", "Dairy", "Kg", 80.0)?;

    let first = network.client_mut(b).catalog.visible_products();
    let again = network.client_mut(b).catalog.visible_products();
    assert!(Arc::ptr_eq(&first, &again));

    network.client_mut(b).catalog.set_query("");
    assert!(Arc::ptr_eq(&first, &network.client_mut(b).catalog.visible_products()));

    network.client(a).seed_product(Some("2"), "Ghee", "Dairy", "Kg", 600.0)?;
    let after_push = network.client_mut(b).catalog.visible_products();
    assert!(!Arc::ptr_eq(&first, &after_push));
    assert_eq!(after_push.len(), 2);
    Ok(())
}

#[test]
fn options_collapse_duplicates_and_offer_other() -> Result<(), Box<dyn std::error::Error>> {
    let client = TestClient::new()?;
    assert_eq!(client.catalog.type_options(), vec!["Other"]);

    client.seed_category(CategoryKind::ProductType, "Sweets")?;
    client.seed_category(CategoryKind::ProductType, "Dairy")?;
    client.seed_category(CategoryKind::ProductType, "Dairy")?;
    client.seed_category(CategoryKind::QuantityType, "Other")?;

    assert_eq!(client.catalog.type_options(), vec!["Dairy", "Other", "Sweets"]);
    assert_eq!(client.catalog.quantity_options(), vec!["Other"]);
    assert_eq!(client.catalog.product_types().len(), 3);
    assert_eq!(client.catalog.quantity_types().len(), 1);
    Ok(())
}

#[test]
fn product_delete_asks_then_removes() -> Result<(), Box<dyn std::error::Error>> {
    let mut client = TestClient::new()?;
    let milk = client.seed_product(Some("M-1"), "Milk", "Dairy", "Litre", 62.0)?;

    client.catalog.request_product_delete(&milk.id)?;
    assert_eq!(client.catalog.deletion().pending(), Some(&milk));
    client.catalog.cancel_product_delete();
    assert!(client.catalog.deletion().pending().is_none());
    assert!(client.store().journal()?.is_empty());

    client.catalog.request_product_delete(&milk.id)?;
    let deleted = client.catalog.confirm_product_delete()?;
    assert_eq!(deleted.id, milk.id);
    assert!(client.catalog.products().is_empty());
    assert_eq!(
        client.store().journal()?,
        vec![JournalEntry::Delete(milk.path())]
    );
    assert_eq!(
        client.catalog.drain_notices(),
        vec![Notice::success("Product deleted successfully.")]
    );
    Ok(())
}

#[test]
fn failed_product_delete_is_settled_anyway() -> Result<(), Box<dyn std::error::Error>> {
    let mut client = TestClient::new()?;
    let milk = client.seed_product(None, "Milk", "Dairy", "Litre", 62.0)?;
    client.store().fail_deletes(Collection::Products)?;

    client.catalog.request_product_delete(&milk.id)?;
    assert!(client.catalog.confirm_product_delete().unwrap_err().is_store_failure());
    assert!(client.catalog.deletion().pending().is_none());
    assert_eq!(client.catalog.products().len(), 1);
    assert_eq!(
        client.catalog.drain_notices(),
        vec![Notice::error("Error", "Failed to delete product.")]
    );
    Ok(())
}

#[test]
fn opened_from_config_with_a_file_store() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("shop.db");
    let config = CatalogConfig::from_toml_str(&format!(
        "[store]\npath = {:?}\n\n[logging]\nlevel = \"debug\"\nansi = false\n",
        file.display().to_string()
    ))?;
    findprice_engine::logging::init(&config.logging)?;

    let mut catalog = Catalog::open(&config)?;
    assert!(!catalog.is_loading());
    catalog.add_product();
    let form = catalog.form_mut();
    form.set_name("Butter")?;
    form.select_category(CategoryKind::ProductType, "Dairy")?;
    form.select_category(CategoryKind::QuantityType, "Kg")?;
    form.set_rate(RateTier::Retail, 500.0)?;
    let saved = catalog.submit_product()?.product;
    catalog.close();

    let reopened = Catalog::open(&config)?;
    assert_eq!(reopened.product(&saved.id), Some(saved));
    Ok(())
}

#[test]
fn form_edits_require_an_open_form() -> Result<(), Box<dyn std::error::Error>> {
    let mut client = TestClient::new()?;
    assert!(matches!(
        client.catalog.form_mut().set_name("x"),
        Err(EngineError::SessionClosed)
    ));
    client.catalog.add_product();
    assert!(matches!(
        client
            .catalog
            .form_mut()
            .set_new_category_name(CategoryKind::ProductType, "Goat"),
        Err(EngineError::InlineEntryClosed(CategoryKind::ProductType))
    ));
    Ok(())
}
