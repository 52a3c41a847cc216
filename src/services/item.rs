use crate::models::item::Item;
use crate::storage::{ItemProvider, ItemSaver, StorageError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{op}: {source}")]
pub struct ItemError {
    pub op: &'static str,
    #[source]
    pub source: StorageError,
}

/// Owner-scoped item operations. Title/description are validated by the
/// handler before they get here.
pub struct ItemService {
    saver: Arc<dyn ItemSaver>,
    provider: Arc<dyn ItemProvider>,
}

impl ItemService {
    pub fn new(saver: Arc<dyn ItemSaver>, provider: Arc<dyn ItemProvider>) -> Self {
        Self { saver, provider }
    }

    pub async fn create_item(
        &self,
        owner_id: i64,
        title: &str,
        description: &str,
    ) -> Result<i64, ItemError> {
        const OP: &str = "services.item.create_item";
        tracing::info!(op = OP, owner_id, "creating item");

        let id = self
            .saver
            .save_item(owner_id, title, description)
            .await
            .map_err(|e| {
                tracing::error!(op = OP, error = %e, "failed to save item");
                ItemError { op: OP, source: e }
            })?;

        tracing::info!(op = OP, item_id = id, "item saved");
        Ok(id)
    }

    pub async fn list_items(&self, owner_id: i64) -> Result<Vec<Item>, ItemError> {
        const OP: &str = "services.item.list_items";
        tracing::info!(op = OP, owner_id, "getting items");

        let items = self.provider.items(owner_id).await.map_err(|e| {
            tracing::error!(op = OP, error = %e, "failed to get items");
            ItemError { op: OP, source: e }
        })?;

        tracing::info!(op = OP, count = items.len(), "got items");
        Ok(items)
    }
}
