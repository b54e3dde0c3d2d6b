use findprice_core::{CategoryKind, CoreError, Document, Key, Product, StorePath, category_value};
use findprice_engine::{Catalog, EngineError};
use findprice_storage::{SqliteStore, Store};

use crate::flaky::FlakyStore;

/// One user of the catalog. Writes go through a [`FlakyStore`] so each
/// client can be made to fail independently of the others.
pub struct TestClient {
    pub catalog: Catalog<FlakyStore<SqliteStore>>,
}

impl TestClient {
    /// A client on its own private in-memory store.
    pub fn new() -> Result<Self, EngineError> {
        Self::connect(SqliteStore::open_in_memory()?)
    }

    pub fn connect(store: SqliteStore) -> Result<Self, EngineError> {
        Ok(Self {
            catalog: Catalog::attach(FlakyStore::new(store))?,
        })
    }

    pub fn store(&self) -> &FlakyStore<SqliteStore> {
        self.catalog.store()
    }

    /// Writes a category straight to the store, bypassing every session.
    pub fn seed_category(&self, kind: CategoryKind, name: &str) -> Result<Key, EngineError> {
        let path = self.store().inner().generate_key(&kind.collection().path())?;
        self.store().inner().write_at(&path, &category_value(name))?;
        key_of(&path)
    }

    /// Writes a product straight to the store, bypassing every session.
    pub fn seed_product(
        &self,
        product_id: Option<&str>,
        name: &str,
        product_type: &str,
        quantity: &str,
        retail_rate: f64,
    ) -> Result<Product, EngineError> {
        let path = self.store().inner().generate_key(&Product::COLLECTION.path())?;
        let product = Product {
            id: key_of(&path)?,
            product_id: product_id.map(str::to_string),
            name: name.to_string(),
            product_type: product_type.to_string(),
            quantity: quantity.to_string(),
            retail_rate,
            wholesale_rate: retail_rate,
            purchase_rate: retail_rate,
        };
        self.store().inner().write_at(&path, &product.to_value())?;
        Ok(product)
    }

    pub fn category_names(&self, kind: CategoryKind) -> Vec<String> {
        let mut names: Vec<String> = self
            .catalog
            .category_items(kind)
            .into_iter()
            .map(|item| item.name)
            .collect();
        names.sort();
        names
    }
}

fn key_of(path: &StorePath) -> Result<Key, EngineError> {
    path.key()
        .ok_or_else(|| EngineError::Core(CoreError::InvalidPath(path.to_string())))
}
