use tracing::{info, warn};

use findprice_core::{Document, Product};
use findprice_storage::Store;

use crate::error::EngineError;

/// Confirmation step in front of deleting a product.
#[derive(Debug, Default)]
pub struct ProductDeletion {
    pending: Option<Product>,
}

impl ProductDeletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&Product> {
        self.pending.as_ref()
    }

    pub fn request(&mut self, product: &Product) {
        self.pending = Some(product.clone());
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Deletes the pending product. The request is settled either way; a
    /// failed delete has to be requested again.
    pub fn confirm<S: Store + ?Sized>(&mut self, store: &S) -> Result<Product, EngineError> {
        let product = self.pending.take().ok_or(EngineError::NothingPending)?;
        let path = product.path();
        match store.delete_at(&path) {
            Ok(()) => {
                info!(%path, name = %product.name, "product deleted");
                Ok(product)
            }
            Err(e) => {
                warn!(%path, error = %e, "product delete failed");
                Err(e.into())
            }
        }
    }
}
