use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info};

use findprice_core::filter::{filter_products, sort_products};
use findprice_core::options::category_options;
use findprice_core::validation::DraftField;
use findprice_core::{
    Category, CategoryItem, CategoryKind, Key, Product, ProductType, QuantityType,
};
use findprice_storage::{SqliteStore, Store};

use crate::categories::CategorySession;
use crate::config::CatalogConfig;
use crate::deletion::ProductDeletion;
use crate::error::EngineError;
use crate::mirror::LiveCollection;
use crate::notice::Notice;
use crate::product_form::{ProductEditSession, SubmitOutcome};

#[derive(Debug)]
struct VisibleProducts {
    revision: u64,
    query: String,
    items: Arc<[Product]>,
}

/// One client's view of the catalog: the three mirrored collections, the
/// search box, and every dialog that writes to the store.
pub struct Catalog<S: Store> {
    store: S,
    products: LiveCollection<Product>,
    product_types: LiveCollection<ProductType>,
    quantity_types: LiveCollection<QuantityType>,
    query: String,
    visible: Option<VisibleProducts>,
    form: ProductEditSession,
    categories: CategorySession,
    deletion: ProductDeletion,
    notices: VecDeque<Notice>,
}

impl Catalog<SqliteStore> {
    /// Opens the configured store and attaches all three mirrors.
    pub fn open(config: &CatalogConfig) -> Result<Self, EngineError> {
        let store = if config.store.is_in_memory() {
            SqliteStore::open_in_memory()?
        } else {
            SqliteStore::open(&config.store.path)?
        };
        info!(path = %config.store.path, "catalog store opened");
        Self::attach(store)
    }
}

impl<S: Store> Catalog<S> {
    pub fn attach(store: S) -> Result<Self, EngineError> {
        let products = LiveCollection::attach(&store)?;
        let product_types = LiveCollection::attach(&store)?;
        let quantity_types = LiveCollection::attach(&store)?;
        Ok(Self {
            store,
            products,
            product_types,
            quantity_types,
            query: String::new(),
            visible: None,
            form: ProductEditSession::new(),
            categories: CategorySession::new(),
            deletion: ProductDeletion::new(),
            notices: VecDeque::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// True until the product list has received its first snapshot.
    pub fn is_loading(&self) -> bool {
        !self.products.is_loaded()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
    }

    /// Products sorted by product id and narrowed by the current query.
    /// Recomputed only after a new product snapshot or a query change.
    pub fn visible_products(&mut self) -> Arc<[Product]> {
        let view = self.products.view();
        if let Some(memo) = &self.visible {
            if memo.revision == view.revision && memo.query == self.query {
                return Arc::clone(&memo.items);
            }
        }
        let mut sorted = view.items.to_vec();
        sort_products(&mut sorted);
        let items: Arc<[Product]> = filter_products(&sorted, &self.query).into_owned().into();
        debug!(revision = view.revision, query = %self.query, count = items.len(), "visible products recomputed");
        self.visible = Some(VisibleProducts {
            revision: view.revision,
            query: self.query.clone(),
            items: Arc::clone(&items),
        });
        items
    }

    pub fn products(&self) -> Arc<[Product]> {
        self.products.items()
    }

    pub fn product(&self, key: &Key) -> Option<Product> {
        self.products.get(key)
    }

    pub fn product_types(&self) -> Arc<[ProductType]> {
        self.product_types.items()
    }

    pub fn quantity_types(&self) -> Arc<[QuantityType]> {
        self.quantity_types.items()
    }

    pub fn type_options(&self) -> Vec<String> {
        let types = self.product_types();
        category_options(types.iter().map(|t| t.name.as_str()))
    }

    pub fn quantity_options(&self) -> Vec<String> {
        let quantities = self.quantity_types();
        category_options(quantities.iter().map(|q| q.name.as_str()))
    }

    /// Entries of one vocabulary, tagged for the category dialog.
    pub fn category_items(&self, kind: CategoryKind) -> Vec<CategoryItem> {
        match kind {
            CategoryKind::ProductType => self.product_types().iter().map(Category::item).collect(),
            CategoryKind::QuantityType => self.quantity_types().iter().map(Category::item).collect(),
        }
    }

    pub fn form(&self) -> &ProductEditSession {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ProductEditSession {
        &mut self.form
    }

    pub fn add_product(&mut self) {
        self.form.open_create();
    }

    pub fn edit_product(&mut self, key: &Key) -> Result<(), EngineError> {
        let product = self
            .products
            .get(key)
            .ok_or_else(|| EngineError::UnknownProduct(key.clone()))?;
        self.form.open_edit(&product);
        Ok(())
    }

    pub fn cancel_product_form(&mut self) {
        self.form.cancel();
    }

    pub fn submit_product(&mut self) -> Result<SubmitOutcome, EngineError> {
        let result = self.form.submit(&self.store);
        match &result {
            Ok(outcome) => {
                let description = if outcome.created {
                    "Product added successfully."
                } else {
                    "Product updated successfully."
                };
                self.notify(Notice::success(description).with_title("Success!"));
            }
            Err(EngineError::Validation(errors)) => {
                let inline = [DraftField::NewProductType, DraftField::NewQuantity];
                let messages: Vec<&'static str> =
                    inline.iter().filter_map(|field| errors.get(*field)).collect();
                for message in messages {
                    self.notify(Notice::error("Error", message));
                }
            }
            Err(e) if e.is_store_failure() => self.notify(Notice::error(
                "Uh oh! Something went wrong.",
                "There was a problem with your request.",
            )),
            Err(_) => {}
        }
        result
    }

    pub fn categories(&self) -> &CategorySession {
        &self.categories
    }

    pub fn categories_mut(&mut self) -> &mut CategorySession {
        &mut self.categories
    }

    pub fn commit_category_edit(&mut self) -> Result<CategoryItem, EngineError> {
        let result = self.categories.commit_edit(&self.store);
        match &result {
            Ok(_) => self.notify(Notice::success("Item updated successfully.")),
            Err(e) if e.is_store_failure() => {
                self.notify(Notice::error("Error", "Failed to update item."))
            }
            Err(_) => {}
        }
        result
    }

    pub fn confirm_category_delete(&mut self) -> Result<CategoryItem, EngineError> {
        let result = self.categories.confirm_delete(&self.store);
        match &result {
            Ok(_) => self.notify(Notice::success("Item deleted successfully.")),
            Err(e) if e.is_store_failure() => {
                self.notify(Notice::error("Error", "Failed to delete item."))
            }
            Err(_) => {}
        }
        result
    }

    pub fn close_categories(&mut self) {
        self.categories.close();
    }

    pub fn deletion(&self) -> &ProductDeletion {
        &self.deletion
    }

    pub fn request_product_delete(&mut self, key: &Key) -> Result<(), EngineError> {
        let product = self
            .products
            .get(key)
            .ok_or_else(|| EngineError::UnknownProduct(key.clone()))?;
        self.deletion.request(&product);
        Ok(())
    }

    pub fn cancel_product_delete(&mut self) {
        self.deletion.cancel();
    }

    pub fn confirm_product_delete(&mut self) -> Result<Product, EngineError> {
        let result = self.deletion.confirm(&self.store);
        match &result {
            Ok(_) => self.notify(Notice::success("Product deleted successfully.")),
            Err(e) if e.is_store_failure() => {
                self.notify(Notice::error("Error", "Failed to delete product."))
            }
            Err(_) => {}
        }
        result
    }

    fn notify(&mut self, notice: Notice) {
        debug!(%notice, "notice queued");
        self.notices.push_back(notice);
    }

    /// Takes every notice queued since the last call, oldest first.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Releases all three subscriptions. Dropping the catalog does the same.
    pub fn close(self) {
        self.products.close();
        self.product_types.close();
        self.quantity_types.close();
        info!("catalog closed");
    }
}
