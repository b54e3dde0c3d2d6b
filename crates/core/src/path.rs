use std::fmt;

use crate::error::CoreError;
use crate::ids::{Key, is_valid_segment};

/// The three top-level collections of the catalog. Their names are the
/// on-store path segments and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Products,
    ProductTypes,
    QuantityTypes,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Self::Products, Self::ProductTypes, Self::QuantityTypes];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::ProductTypes => "productTypes",
            Self::QuantityTypes => "quantityTypes",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "products" => Ok(Self::Products),
            "productTypes" => Ok(Self::ProductTypes),
            "quantityTypes" => Ok(Self::QuantityTypes),
            _ => Err(CoreError::UnknownCollection(s.to_string())),
        }
    }

    pub fn path(&self) -> StorePath {
        StorePath {
            segments: vec![self.as_str().to_string()],
        }
    }

    pub fn document(&self, key: &Key) -> StorePath {
        self.path().child(key)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slash-separated location in the store, e.g. `products/<key>`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Err(CoreError::InvalidPath(raw.to_string()));
        }
        let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        if !segments.iter().all(|s| is_valid_segment(s)) {
            return Err(CoreError::InvalidPath(raw.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn child(&self, key: &Key) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.as_str().to_string());
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Last segment as a key. `None` for a top-level collection path.
    pub fn key(&self) -> Option<Key> {
        if self.segments.len() < 2 {
            return None;
        }
        self.segments.last().map(|s| Key::from_segment(s))
    }

    pub fn collection(&self) -> Option<Collection> {
        Collection::parse(&self.segments[0]).ok()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_collection(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn is_document(&self) -> bool {
        self.segments.len() == 2
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl fmt::Debug for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorePath({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_match_store_layout() {
        assert_eq!(Collection::Products.path().to_string(), "products");
        assert_eq!(Collection::ProductTypes.path().to_string(), "productTypes");
        assert_eq!(Collection::QuantityTypes.path().to_string(), "quantityTypes");
        for c in Collection::ALL {
            assert_eq!(Collection::parse(c.as_str()).unwrap(), c);
        }
    }

    #[test]
    fn document_path_roundtrips_through_text() {
        let key = Key::parse("k1").unwrap();
        let path = Collection::QuantityTypes.document(&key);
        assert_eq!(path.to_string(), "quantityTypes/k1");
        assert!(path.is_document());

        let parsed = StorePath::parse("/quantityTypes/k1/").unwrap();
        assert_eq!(parsed, path);
        assert_eq!(parsed.key(), Some(key));
        assert_eq!(parsed.parent(), Some(Collection::QuantityTypes.path()));
        assert_eq!(parsed.collection(), Some(Collection::QuantityTypes));
    }

    #[test]
    fn collection_path_has_no_key_or_parent() {
        let path = Collection::Products.path();
        assert!(path.is_collection());
        assert_eq!(path.key(), None);
        assert_eq!(path.parent(), None);
    }

    #[test]
    fn malformed_paths_rejected() {
        assert!(StorePath::parse("").is_err());
        assert!(StorePath::parse("/").is_err());
        assert!(StorePath::parse("products//k1").is_err());
        assert!(StorePath::parse("products/k.1").is_err());
    }
}
