use std::fmt;

use crate::ids::Key;
use crate::model::{CategoryKind, Product};

/// Inputs of the product form, plus the inline category rename box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    ProductId,
    Name,
    ProductType,
    Quantity,
    RetailRate,
    WholesaleRate,
    PurchaseRate,
    NewProductType,
    NewQuantity,
    CategoryName,
}

impl DraftField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductId => "productId",
            Self::Name => "name",
            Self::ProductType => "type",
            Self::Quantity => "quantity",
            Self::RetailRate => "retailRate",
            Self::WholesaleRate => "wholesaleRate",
            Self::PurchaseRate => "purchaseRate",
            Self::NewProductType => "newProductType",
            Self::NewQuantity => "newQuantity",
            Self::CategoryName => "categoryName",
        }
    }

    /// The category selector for a vocabulary.
    pub fn selector(kind: CategoryKind) -> Self {
        match kind {
            CategoryKind::ProductType => Self::ProductType,
            CategoryKind::QuantityType => Self::Quantity,
        }
    }

    /// The inline "new value" entry that opens beside a selector.
    pub fn inline_entry(kind: CategoryKind) -> Self {
        match kind {
            CategoryKind::ProductType => Self::NewProductType,
            CategoryKind::QuantityType => Self::NewQuantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateTier {
    Retail,
    Wholesale,
    Purchase,
}

impl RateTier {
    pub const ALL: [RateTier; 3] = [Self::Retail, Self::Wholesale, Self::Purchase];

    pub fn field(&self) -> DraftField {
        match self {
            Self::Retail => DraftField::RetailRate,
            Self::Wholesale => DraftField::WholesaleRate,
            Self::Purchase => DraftField::PurchaseRate,
        }
    }

    fn invalid_message(&self) -> &'static str {
        match self {
            Self::Retail => "Retail rate must be a positive number.",
            Self::Wholesale => "Wholesale rate must be a positive number.",
            Self::Purchase => "Purchase rate must be a positive number.",
        }
    }
}

/// Coerces rate input text: blank is zero, anything unparsable is NaN and
/// fails validation later.
pub fn parse_rate(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: DraftField,
    pub message: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: DraftField, message: &'static str) {
        self.0.push(FieldError { field, message });
    }

    pub fn get(&self, field: DraftField) -> Option<&'static str> {
        self.0.iter().find(|e| e.field == field).map(|e| e.message)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(error.message)?;
        }
        Ok(())
    }
}

/// Working copy of the product form. Nothing here reaches the store until
/// the form is submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub product_id: String,
    pub name: String,
    pub product_type: String,
    pub quantity: String,
    pub retail_rate: f64,
    pub wholesale_rate: f64,
    pub purchase_rate: f64,
}

impl Default for ProductDraft {
    fn default() -> Self {
        Self {
            product_id: String::new(),
            name: String::new(),
            product_type: String::new(),
            quantity: String::new(),
            retail_rate: 0.0,
            wholesale_rate: 0.0,
            purchase_rate: 0.0,
        }
    }
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.product_id.clone().unwrap_or_default(),
            name: product.name.clone(),
            product_type: product.product_type.clone(),
            quantity: product.quantity.clone(),
            retail_rate: product.retail_rate,
            wholesale_rate: product.wholesale_rate,
            purchase_rate: product.purchase_rate,
        }
    }
}

impl ProductDraft {
    pub fn category(&self, kind: CategoryKind) -> &str {
        match kind {
            CategoryKind::ProductType => &self.product_type,
            CategoryKind::QuantityType => &self.quantity,
        }
    }

    pub fn set_category(&mut self, kind: CategoryKind, value: impl Into<String>) {
        match kind {
            CategoryKind::ProductType => self.product_type = value.into(),
            CategoryKind::QuantityType => self.quantity = value.into(),
        }
    }

    pub fn rate(&self, tier: RateTier) -> f64 {
        match tier {
            RateTier::Retail => self.retail_rate,
            RateTier::Wholesale => self.wholesale_rate,
            RateTier::Purchase => self.purchase_rate,
        }
    }

    pub fn set_rate(&mut self, tier: RateTier, rate: f64) {
        match tier {
            RateTier::Retail => self.retail_rate = rate,
            RateTier::Wholesale => self.wholesale_rate = rate,
            RateTier::Purchase => self.purchase_rate = rate,
        }
    }

    /// Field-level checks; every failing field is reported, not just the first.
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.name.is_empty() {
            errors.push(DraftField::Name, "Product name is required.");
        }
        if self.product_type.is_empty() {
            errors.push(DraftField::ProductType, "Product type is required.");
        }
        if self.quantity.is_empty() {
            errors.push(DraftField::Quantity, "Quantity is required.");
        }
        for tier in RateTier::ALL {
            let rate = self.rate(tier);
            if !(rate.is_finite() && rate >= 0.0) {
                errors.push(tier.field(), tier.invalid_message());
            }
        }
        errors
    }

    pub fn to_product(&self, id: Key) -> Product {
        Product {
            id,
            product_id: (!self.product_id.is_empty()).then(|| self.product_id.clone()),
            name: self.name.clone(),
            product_type: self.product_type.clone(),
            quantity: self.quantity.clone(),
            retail_rate: self.retail_rate,
            wholesale_rate: self.wholesale_rate,
            purchase_rate: self.purchase_rate,
        }
    }
}
