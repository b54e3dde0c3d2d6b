use std::collections::BTreeMap;
use std::fmt;

use crate::error::CoreError;
use crate::field_value::{FieldValue, format_number};
use crate::ids::Key;
use crate::path::{Collection, StorePath};

/// Inline selection meaning "define a new category here". Never stored as a
/// category name by the form.
pub const OTHER_SENTINEL: &str = "Other";

pub fn is_sentinel(value: &str) -> bool {
    value.to_lowercase() == OTHER_SENTINEL.to_lowercase()
}

/// On-store field names of a product document.
pub mod fields {
    pub const PRODUCT_ID: &str = "productId";
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const QUANTITY: &str = "quantity";
    pub const RETAIL_RATE: &str = "retailRate";
    pub const WHOLESALE_RATE: &str = "wholesaleRate";
    pub const PURCHASE_RATE: &str = "purchaseRate";
}

/// An entity stored as one document under a fixed collection. The key is
/// carried on the entity but never written into the document body.
pub trait Document: Sized + Clone {
    const COLLECTION: Collection;

    fn key(&self) -> &Key;

    fn from_value(key: Key, value: &FieldValue) -> Result<Self, CoreError>;

    /// The complete stored value. Writes always replace the whole document.
    fn to_value(&self) -> FieldValue;

    fn path(&self) -> StorePath {
        Self::COLLECTION.document(self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Key,
    pub product_id: Option<String>,
    pub name: String,
    pub product_type: String,
    pub quantity: String,
    pub retail_rate: f64,
    pub wholesale_rate: f64,
    pub purchase_rate: f64,
}

impl Product {
    /// Every field in text form, the key included, as matched by the search box.
    pub fn searchable_values(&self) -> Vec<String> {
        let mut values = vec![self.id.to_string()];
        if let Some(product_id) = &self.product_id {
            values.push(product_id.clone());
        }
        values.push(self.name.clone());
        values.push(self.product_type.clone());
        values.push(self.quantity.clone());
        values.push(format_number(self.retail_rate));
        values.push(format_number(self.wholesale_rate));
        values.push(format_number(self.purchase_rate));
        values
    }
}

impl Document for Product {
    const COLLECTION: Collection = Collection::Products;

    fn key(&self) -> &Key {
        &self.id
    }

    fn from_value(key: Key, value: &FieldValue) -> Result<Self, CoreError> {
        let location = Self::COLLECTION.document(&key);
        let doc = document_fields(&location, value)?;
        let product_id = text_field(&location, doc, fields::PRODUCT_ID)?;
        Ok(Self {
            product_id: (!product_id.is_empty()).then_some(product_id),
            name: text_field(&location, doc, fields::NAME)?,
            product_type: text_field(&location, doc, fields::TYPE)?,
            quantity: text_field(&location, doc, fields::QUANTITY)?,
            retail_rate: number_field(&location, doc, fields::RETAIL_RATE)?,
            wholesale_rate: number_field(&location, doc, fields::WHOLESALE_RATE)?,
            purchase_rate: number_field(&location, doc, fields::PURCHASE_RATE)?,
            id: key,
        })
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::map([
            (
                fields::PRODUCT_ID,
                FieldValue::from(self.product_id.clone().unwrap_or_default()),
            ),
            (fields::NAME, FieldValue::from(self.name.as_str())),
            (fields::TYPE, FieldValue::from(self.product_type.as_str())),
            (fields::QUANTITY, FieldValue::from(self.quantity.as_str())),
            (fields::RETAIL_RATE, FieldValue::from(self.retail_rate)),
            (fields::WHOLESALE_RATE, FieldValue::from(self.wholesale_rate)),
            (fields::PURCHASE_RATE, FieldValue::from(self.purchase_rate)),
        ])
    }
}

/// Which of the two controlled vocabularies a category belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoryKind {
    ProductType,
    QuantityType,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 2] = [Self::ProductType, Self::QuantityType];

    pub const fn collection(&self) -> Collection {
        match self {
            Self::ProductType => Collection::ProductTypes,
            Self::QuantityType => Collection::QuantityTypes,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ProductType => "product type",
            Self::QuantityType => "quantity",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Document body of a category: `{ name }`.
pub fn category_value(name: &str) -> FieldValue {
    FieldValue::map([("name", FieldValue::from(name))])
}

pub trait Category: Document {
    const KIND: CategoryKind;

    fn name(&self) -> &str;

    fn item(&self) -> CategoryItem {
        CategoryItem {
            id: self.key().clone(),
            name: self.name().to_string(),
            kind: Self::KIND,
        }
    }
}

macro_rules! category_document {
    ($name:ident, $kind:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub id: Key,
            pub name: String,
        }

        impl Document for $name {
            const COLLECTION: Collection = $kind.collection();

            fn key(&self) -> &Key {
                &self.id
            }

            fn from_value(key: Key, value: &FieldValue) -> Result<Self, CoreError> {
                let location = Self::COLLECTION.document(&key);
                let doc = document_fields(&location, value)?;
                Ok(Self {
                    name: text_field(&location, doc, "name")?,
                    id: key,
                })
            }

            fn to_value(&self) -> FieldValue {
                category_value(&self.name)
            }
        }

        impl Category for $name {
            const KIND: CategoryKind = $kind;

            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

category_document!(ProductType, CategoryKind::ProductType);
category_document!(QuantityType, CategoryKind::QuantityType);

/// A category tagged with the collection it came from, so that edits and
/// deletes land on the right path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryItem {
    pub id: Key,
    pub name: String,
    pub kind: CategoryKind,
}

impl CategoryItem {
    pub fn path(&self) -> StorePath {
        self.kind.collection().document(&self.id)
    }

    pub fn same_entry(&self, other: &CategoryItem) -> bool {
        self.id == other.id && self.kind == other.kind
    }
}

fn document_fields<'a>(
    location: &StorePath,
    value: &'a FieldValue,
) -> Result<&'a BTreeMap<String, FieldValue>, CoreError> {
    value.as_map().ok_or_else(|| CoreError::InvalidData {
        path: location.to_string(),
        reason: "expected a document".to_string(),
    })
}

/// Missing text reads as empty; scalars are accepted in their text form.
fn text_field(
    location: &StorePath,
    doc: &BTreeMap<String, FieldValue>,
    field: &str,
) -> Result<String, CoreError> {
    match doc.get(field) {
        None | Some(FieldValue::Null) => Ok(String::new()),
        Some(FieldValue::Text(s)) => Ok(s.clone()),
        Some(v @ (FieldValue::Number(_) | FieldValue::Boolean(_))) => Ok(v.display_string()),
        Some(FieldValue::Map(_)) => Err(CoreError::InvalidData {
            path: location.to_string(),
            reason: format!("field {field} is not text"),
        }),
    }
}

/// Missing numbers read as zero; numeric text is parsed.
fn number_field(
    location: &StorePath,
    doc: &BTreeMap<String, FieldValue>,
    field: &str,
) -> Result<f64, CoreError> {
    let invalid = || CoreError::InvalidData {
        path: location.to_string(),
        reason: format!("field {field} is not a number"),
    };
    match doc.get(field) {
        None | Some(FieldValue::Null) => Ok(0.0),
        Some(FieldValue::Number(n)) => Ok(*n),
        Some(FieldValue::Text(s)) if s.trim().is_empty() => Ok(0.0),
        Some(FieldValue::Text(s)) => s.trim().parse().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Key {
        Key::parse(s).unwrap()
    }

    #[test]
    fn product_document_uses_store_field_names() {
        let product = Product {
            id: key("p1"),
            product_id: Some("SKU-1".into()),
            name: "Whole Milk".into(),
            product_type: "Dairy".into(),
            quantity: "Litre".into(),
            retail_rate: 62.0,
            wholesale_rate: 58.5,
            purchase_rate: 55.0,
        };
        let value = product.to_value();
        let doc = value.as_map().unwrap();
        let names: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["name", "productId", "purchaseRate", "quantity", "retailRate", "type", "wholesaleRate"]
        );
        assert!(doc.get("id").is_none());

        let decoded = Product::from_value(key("p1"), &value).unwrap();
        assert_eq!(decoded, product);
        assert_eq!(decoded.path().to_string(), "products/p1");
    }

    #[test]
    fn sparse_product_document_decodes_with_defaults() {
        let value = FieldValue::map([
            ("name", FieldValue::from("Paneer")),
            ("retailRate", FieldValue::from("120")),
        ]);
        let product = Product::from_value(key("p2"), &value).unwrap();
        assert_eq!(product.product_id, None);
        assert_eq!(product.product_type, "");
        assert_eq!(product.retail_rate, 120.0);
        assert_eq!(product.purchase_rate, 0.0);
    }

    #[test]
    fn non_document_values_rejected() {
        assert!(Product::from_value(key("p3"), &FieldValue::from("oops")).is_err());
        let bad_rate = FieldValue::map([("retailRate", FieldValue::from("lots"))]);
        assert!(Product::from_value(key("p3"), &bad_rate).is_err());
    }

    #[test]
    fn categories_store_only_a_name() {
        let litre = QuantityType::from_value(key("k1"), &category_value("Litre")).unwrap();
        assert_eq!(litre.name, "Litre");
        assert_eq!(litre.path().to_string(), "quantityTypes/k1");
        assert_eq!(litre.to_value(), category_value("Litre"));

        let item = litre.item();
        assert_eq!(item.kind, CategoryKind::QuantityType);
        assert_eq!(item.path().to_string(), "quantityTypes/k1");
    }

    #[test]
    fn sentinel_matches_case_insensitively() {
        assert!(is_sentinel("Other"));
        assert!(is_sentinel("other"));
        assert!(is_sentinel("OTHER"));
        assert!(!is_sentinel("Others"));
        assert!(!is_sentinel(""));
    }

    #[test]
    fn same_key_in_different_vocabularies_is_a_different_entry() {
        let a = CategoryItem { id: key("k"), name: "A".into(), kind: CategoryKind::ProductType };
        let b = CategoryItem { id: key("k"), name: "A".into(), kind: CategoryKind::QuantityType };
        assert!(!a.same_entry(&b));
        assert!(a.same_entry(&a.clone()));
    }
}
