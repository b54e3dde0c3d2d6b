use tracing::{debug, info, warn};

use findprice_core::validation::{DraftField, FieldErrors, ProductDraft, RateTier, parse_rate};
use findprice_core::{
    CategoryKind, CoreError, Document, Key, Product, StorePath, category_value, is_sentinel,
};
use findprice_storage::Store;

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Closed,
    Create,
    Edit(Key),
}

/// Result of a successful submit.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub product: Product,
    pub created: bool,
    /// Categories written ahead of the product, in write order.
    pub new_categories: Vec<(CategoryKind, Key)>,
}

/// A validated submission, in the order its writes must happen: new
/// categories first, then the product that names them.
#[derive(Debug)]
struct SubmitPlan {
    target: Option<Key>,
    draft: ProductDraft,
    new_categories: Vec<(CategoryKind, String)>,
}

impl SubmitPlan {
    /// Runs the writes in sequence and stops at the first failure. A
    /// category already written stays written if a later step fails.
    fn execute<S: Store + ?Sized>(mut self, store: &S) -> Result<SubmitOutcome, EngineError> {
        let mut written = Vec::with_capacity(self.new_categories.len());
        for (kind, name) in &self.new_categories {
            let path = store.generate_key(&kind.collection().path())?;
            let key = document_key(&path)?;
            store.write_at(&path, &category_value(name))?;
            info!(%path, %name, kind = %kind, "category created inline");
            self.draft.set_category(*kind, name.as_str());
            written.push((*kind, key));
        }

        let (key, created) = match self.target {
            Some(key) => (key, false),
            None => {
                let path = store.generate_key(&Product::COLLECTION.path())?;
                (document_key(&path)?, true)
            }
        };
        let product = self.draft.to_product(key);
        store.write_at(&product.path(), &product.to_value())?;
        info!(path = %product.path(), created, "product saved");

        Ok(SubmitOutcome {
            product,
            created,
            new_categories: written,
        })
    }
}

fn document_key(path: &StorePath) -> Result<Key, EngineError> {
    path.key()
        .ok_or_else(|| EngineError::Core(CoreError::InvalidPath(path.to_string())))
}

/// Lifecycle of the add/edit product form, including the inline entry of a
/// new product type or quantity when "Other" is picked.
#[derive(Debug)]
pub struct ProductEditSession {
    mode: FormMode,
    draft: ProductDraft,
    new_product_type: Option<String>,
    new_quantity: Option<String>,
    errors: FieldErrors,
}

impl Default for ProductEditSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductEditSession {
    pub fn new() -> Self {
        Self {
            mode: FormMode::Closed,
            draft: ProductDraft::default(),
            new_product_type: None,
            new_quantity: None,
            errors: FieldErrors::new(),
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_open(&self) -> bool {
        self.mode != FormMode::Closed
    }

    pub fn draft(&self) -> &ProductDraft {
        &self.draft
    }

    /// Errors from the last rejected submit.
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Text of the inline new-category entry, `None` while it is closed.
    pub fn new_category_entry(&self, kind: CategoryKind) -> Option<&str> {
        match kind {
            CategoryKind::ProductType => self.new_product_type.as_deref(),
            CategoryKind::QuantityType => self.new_quantity.as_deref(),
        }
    }

    fn entry_mut(&mut self, kind: CategoryKind) -> &mut Option<String> {
        match kind {
            CategoryKind::ProductType => &mut self.new_product_type,
            CategoryKind::QuantityType => &mut self.new_quantity,
        }
    }

    fn reset(&mut self, mode: FormMode, draft: ProductDraft) {
        self.mode = mode;
        self.draft = draft;
        self.new_product_type = None;
        self.new_quantity = None;
        self.errors = FieldErrors::new();
    }

    pub fn open_create(&mut self) {
        debug!("product form opened for create");
        self.reset(FormMode::Create, ProductDraft::default());
    }

    /// Starts editing `product`. A product typed "Other" opens with the new
    /// type entry already showing.
    pub fn open_edit(&mut self, product: &Product) {
        debug!(key = %product.id, "product form opened for edit");
        self.reset(FormMode::Edit(product.id.clone()), ProductDraft::from(product));
        if is_sentinel(&product.product_type) {
            self.new_product_type = Some(String::new());
        }
    }

    pub fn cancel(&mut self) {
        debug!("product form cancelled");
        self.reset(FormMode::Closed, ProductDraft::default());
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.is_open() { Ok(()) } else { Err(EngineError::SessionClosed) }
    }

    pub fn set_product_id(&mut self, value: impl Into<String>) -> Result<(), EngineError> {
        self.ensure_open()?;
        self.draft.product_id = value.into();
        Ok(())
    }

    pub fn set_name(&mut self, value: impl Into<String>) -> Result<(), EngineError> {
        self.ensure_open()?;
        self.draft.name = value.into();
        Ok(())
    }

    /// Picks a category value. "Other" opens the inline entry for a new
    /// value; anything else closes it and drops its text.
    pub fn select_category(
        &mut self,
        kind: CategoryKind,
        value: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.ensure_open()?;
        let value = value.into();
        let opens_entry = is_sentinel(&value);
        self.draft.set_category(kind, value);
        let entry = self.entry_mut(kind);
        if opens_entry {
            entry.get_or_insert_with(String::new);
        } else {
            *entry = None;
        }
        Ok(())
    }

    pub fn set_new_category_name(
        &mut self,
        kind: CategoryKind,
        name: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.ensure_open()?;
        match self.entry_mut(kind) {
            Some(entry) => {
                *entry = name.into();
                Ok(())
            }
            None => Err(EngineError::InlineEntryClosed(kind)),
        }
    }

    pub fn set_rate(&mut self, tier: RateTier, rate: f64) -> Result<(), EngineError> {
        self.ensure_open()?;
        self.draft.set_rate(tier, rate);
        Ok(())
    }

    /// Rate as typed by the user; text that is not a number fails on submit.
    pub fn set_rate_text(&mut self, tier: RateTier, text: &str) -> Result<(), EngineError> {
        self.set_rate(tier, parse_rate(text))
    }

    /// All checks that happen before any write: the draft's own fields, and
    /// a non-blank name for every category entered inline.
    fn plan(&self, target: Option<Key>) -> Result<SubmitPlan, FieldErrors> {
        let mut errors = self.draft.validate();
        let mut new_categories = Vec::new();
        for kind in CategoryKind::ALL {
            if !is_sentinel(self.draft.category(kind)) {
                continue;
            }
            let name = self.new_category_entry(kind).unwrap_or_default();
            if name.trim().is_empty() {
                let message = match kind {
                    CategoryKind::ProductType => "New product type cannot be empty.",
                    CategoryKind::QuantityType => "New quantity cannot be empty.",
                };
                errors.push(DraftField::inline_entry(kind), message);
            } else {
                new_categories.push((kind, name.to_string()));
            }
        }
        errors.into_result()?;
        Ok(SubmitPlan {
            target,
            draft: self.draft.clone(),
            new_categories,
        })
    }

    /// Validates, then writes new categories followed by the product. On
    /// success the form closes; on any failure it stays open with the draft
    /// intact so the user can retry.
    ///
    /// Store calls complete before this returns, and the `&mut self` borrow
    /// keeps a second submit from starting while one is running.
    pub fn submit<S: Store + ?Sized>(&mut self, store: &S) -> Result<SubmitOutcome, EngineError> {
        let target = match &self.mode {
            FormMode::Closed => return Err(EngineError::SessionClosed),
            FormMode::Create => None,
            FormMode::Edit(key) => Some(key.clone()),
        };
        let plan = match self.plan(target) {
            Ok(plan) => plan,
            Err(errors) => {
                debug!(%errors, "product form rejected");
                self.errors = errors.clone();
                return Err(EngineError::Validation(errors));
            }
        };
        self.errors = FieldErrors::new();

        match plan.execute(store) {
            Ok(outcome) => {
                self.reset(FormMode::Closed, ProductDraft::default());
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "product submit failed");
                Err(e)
            }
        }
    }
}
