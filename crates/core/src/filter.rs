use std::borrow::Cow;
use std::cmp::Ordering;

use crate::model::Product;

/// Products whose any field, in lowercased text form, contains the lowercased
/// query. A blank query borrows the input back untouched. Relative order is
/// always preserved.
pub fn filter_products<'a>(products: &'a [Product], query: &str) -> Cow<'a, [Product]> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Cow::Borrowed(products);
    }
    Cow::Owned(
        products
            .iter()
            .filter(|p| matches_query(p, &needle))
            .cloned()
            .collect(),
    )
}

/// `needle` must already be lowercased.
pub fn matches_query(product: &Product, needle: &str) -> bool {
    product
        .searchable_values()
        .iter()
        .any(|v| v.to_lowercase().contains(needle))
}

/// Orders by product id, case-insensitively; products without one go last.
/// Stable, so equal ids keep their incoming order.
pub fn sort_products(products: &mut [Product]) {
    products.sort_by(|a, b| compare_product_ids(a.product_id.as_deref(), b.product_id.as_deref()));
}

fn compare_product_ids(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)),
    }
}
