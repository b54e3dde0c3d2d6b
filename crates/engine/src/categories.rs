use tracing::{info, warn};

use findprice_core::validation::{DraftField, FieldErrors};
use findprice_core::{CategoryItem, category_value};
use findprice_storage::Store;

use crate::error::EngineError;

/// Selection, inline rename and delete confirmation across both category
/// vocabularies. At most one item is selected at a time, whichever list it
/// came from.
#[derive(Debug, Default)]
pub struct CategorySession {
    selected: Option<CategoryItem>,
    editing: Option<CategoryItem>,
    edited_name: String,
    pending_delete: Option<CategoryItem>,
}

impl CategorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&CategoryItem> {
        self.selected.as_ref()
    }

    pub fn editing(&self) -> Option<&CategoryItem> {
        self.editing.as_ref()
    }

    pub fn edited_name(&self) -> &str {
        &self.edited_name
    }

    pub fn pending_delete(&self) -> Option<&CategoryItem> {
        self.pending_delete.as_ref()
    }

    pub fn is_selected(&self, item: &CategoryItem) -> bool {
        self.selected.as_ref().is_some_and(|s| s.same_entry(item))
    }

    /// Whether `item`'s row shows the inline editor instead of its name.
    pub fn is_editing(&self, item: &CategoryItem) -> bool {
        self.editing.as_ref().is_some_and(|e| e.same_entry(item))
    }

    /// Selecting another item abandons an edit of the previous one.
    pub fn select(&mut self, item: CategoryItem) {
        if self.editing.as_ref().is_some_and(|e| !e.same_entry(&item)) {
            self.clear_edit();
        }
        self.selected = Some(item);
    }

    pub fn begin_edit(&mut self) -> Result<(), EngineError> {
        let selected = self.selected.clone().ok_or(EngineError::NothingSelected)?;
        self.edited_name = selected.name.clone();
        self.editing = Some(selected);
        Ok(())
    }

    pub fn set_edited_name(&mut self, name: impl Into<String>) -> Result<(), EngineError> {
        if self.editing.is_none() {
            return Err(EngineError::NotEditing);
        }
        self.edited_name = name.into();
        Ok(())
    }

    /// Overwrites the edited item with `{ name }`. A blank name is refused
    /// without touching the store; a store failure keeps the editor open
    /// with the attempted text.
    pub fn commit_edit<S: Store + ?Sized>(&mut self, store: &S) -> Result<CategoryItem, EngineError> {
        let editing = self.editing.clone().ok_or(EngineError::NotEditing)?;
        let name = self.edited_name.trim().to_string();
        if name.is_empty() {
            let mut errors = FieldErrors::new();
            errors.push(DraftField::CategoryName, "Name cannot be empty.");
            return Err(EngineError::Validation(errors));
        }

        let path = editing.path();
        if let Err(e) = store.write_at(&path, &category_value(&name)) {
            warn!(%path, error = %e, "category rename failed");
            return Err(e.into());
        }
        info!(%path, %name, "category renamed");

        self.clear_edit();
        self.selected = None;
        Ok(CategoryItem { name, ..editing })
    }

    pub fn cancel_edit(&mut self) {
        self.clear_edit();
    }

    pub fn request_delete(&mut self) -> Result<(), EngineError> {
        if self.editing.is_some() {
            return Err(EngineError::EditInProgress);
        }
        let selected = self.selected.clone().ok_or(EngineError::NothingSelected)?;
        self.pending_delete = Some(selected);
        Ok(())
    }

    /// Deletes the pending item. Products naming it keep their text as is.
    pub fn confirm_delete<S: Store + ?Sized>(&mut self, store: &S) -> Result<CategoryItem, EngineError> {
        let pending = self.pending_delete.take().ok_or(EngineError::NothingPending)?;
        let path = pending.path();
        if let Err(e) = store.delete_at(&path) {
            warn!(%path, error = %e, "category delete failed");
            return Err(e.into());
        }
        info!(%path, name = %pending.name, "category deleted");
        if self.is_selected(&pending) {
            self.selected = None;
        }
        Ok(pending)
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Forgets everything; nothing carries over to the next open.
    pub fn close(&mut self) {
        *self = Self::default();
    }

    fn clear_edit(&mut self) {
        self.editing = None;
        self.edited_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use findprice_core::{CategoryKind, Key};

    fn item(key: &str, name: &str, kind: CategoryKind) -> CategoryItem {
        CategoryItem {
            id: Key::parse(key).unwrap(),
            name: name.to_string(),
            kind,
        }
    }

    #[test]
    fn selection_is_single_across_vocabularies() {
        let mut session = CategorySession::new();
        let milk = item("k1", "Milk", CategoryKind::ProductType);
        let litre = item("k2", "Litre", CategoryKind::QuantityType);
        session.select(milk.clone());
        session.select(litre.clone());
        assert!(!session.is_selected(&milk));
        assert!(session.is_selected(&litre));
    }

    #[test]
    fn edit_requires_a_selection() {
        let mut session = CategorySession::new();
        assert!(matches!(session.begin_edit(), Err(EngineError::NothingSelected)));
        assert!(matches!(session.set_edited_name("x"), Err(EngineError::NotEditing)));
    }

    #[test]
    fn cancel_then_edit_other_item_starts_fresh() {
        let mut session = CategorySession::new();
        let milk = item("k1", "Milk", CategoryKind::ProductType);
        let kg = item("k2", "Kg", CategoryKind::QuantityType);

        session.select(milk.clone());
        session.begin_edit().unwrap();
        session.set_edited_name("Milk products").unwrap();
        session.cancel_edit();
        assert!(session.is_selected(&milk));
        assert_eq!(session.edited_name(), "");

        session.select(kg.clone());
        session.begin_edit().unwrap();
        assert_eq!(session.edited_name(), "Kg");
        assert!(session.is_editing(&kg));
        assert!(!session.is_editing(&milk));
    }

    #[test]
    fn selecting_elsewhere_abandons_the_edit() {
        let mut session = CategorySession::new();
        let milk = item("k1", "Milk", CategoryKind::ProductType);
        session.select(milk.clone());
        session.begin_edit().unwrap();
        session.set_edited_name("Dairy").unwrap();

        session.select(item("k2", "Kg", CategoryKind::QuantityType));
        assert!(session.editing().is_none());
        assert_eq!(session.edited_name(), "");
    }

    #[test]
    fn delete_needs_selection_and_no_edit() {
        let mut session = CategorySession::new();
        assert!(matches!(session.request_delete(), Err(EngineError::NothingSelected)));

        session.select(item("k1", "Milk", CategoryKind::ProductType));
        session.begin_edit().unwrap();
        assert!(matches!(session.request_delete(), Err(EngineError::EditInProgress)));

        session.cancel_edit();
        session.request_delete().unwrap();
        assert_eq!(session.pending_delete().map(|p| p.name.as_str()), Some("Milk"));

        session.cancel_delete();
        assert!(session.pending_delete().is_none());
        assert!(session.selected().is_some());
    }

    #[test]
    fn close_resets_everything() {
        let mut session = CategorySession::new();
        session.select(item("k1", "Milk", CategoryKind::ProductType));
        session.request_delete().unwrap();
        session.begin_edit().unwrap();
        session.close();
        assert!(session.selected().is_none());
        assert!(session.editing().is_none());
        assert!(session.pending_delete().is_none());
        assert_eq!(session.edited_name(), "");
    }
}
