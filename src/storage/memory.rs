use super::{ItemProvider, ItemSaver, StorageError, StorageHealth, UserProvider, UserSaver};
use crate::models::{item::Item, user::User};
use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    items: Vec<Item>,
}

/// In-process store with the same observable behaviour as the Postgres one:
/// unique emails, ids starting at 1, items listed in insertion order, and an
/// owner that has to exist before it can own anything.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserSaver for MemoryStore {
    async fn save_user(&self, email: &str, password_hash: &str) -> Result<i64, StorageError> {
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.email == email) {
            return Err(StorageError::UserExists);
        }

        let id = tables.users.len() as i64 + 1;
        tables.users.push(User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        });

        Ok(id)
    }
}

#[async_trait]
impl UserProvider for MemoryStore {
    async fn user(&self, email: &str) -> Result<User, StorageError> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StorageError::UserNotFound)
    }
}

#[async_trait]
impl ItemSaver for MemoryStore {
    async fn save_item(
        &self,
        owner_id: i64,
        title: &str,
        description: &str,
    ) -> Result<i64, StorageError> {
        let mut tables = self.tables.write().await;

        // Same rule the foreign key enforces in Postgres.
        if !tables.users.iter().any(|u| u.id == owner_id) {
            return Err(StorageError::UserNotFound);
        }

        let id = tables.items.len() as i64 + 1;
        tables.items.push(Item {
            id,
            title: title.to_string(),
            description: description.to_string(),
            owner_id,
        });

        Ok(id)
    }
}

#[async_trait]
impl ItemProvider for MemoryStore {
    async fn items(&self, owner_id: i64) -> Result<Vec<Item>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .iter()
            .filter(|i| i.owner_id == owner_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StorageHealth for MemoryStore {
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        assert_eq!(store.save_user("a@x.com", "h").await.unwrap(), 1);

        let err = store.save_user("a@x.com", "h2").await.unwrap_err();
        assert!(matches!(err, StorageError::UserExists));
    }

    #[tokio::test]
    async fn items_are_scoped_to_their_owner() {
        let store = MemoryStore::new();
        let alice = store.save_user("alice@x.com", "h").await.unwrap();
        let bob = store.save_user("bob@x.com", "h").await.unwrap();

        store.save_item(alice, "first", "d").await.unwrap();
        store.save_item(bob, "bobs", "d").await.unwrap();
        store.save_item(alice, "second", "d").await.unwrap();

        let titles: Vec<_> = store
            .items(alice)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn item_needs_an_existing_owner() {
        let store = MemoryStore::new();
        let err = store.save_item(42, "t", "d").await.unwrap_err();
        assert!(matches!(err, StorageError::UserNotFound));
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let store = MemoryStore::new();
        let err = store.user("ghost@x.com").await.unwrap_err();
        assert!(matches!(err, StorageError::UserNotFound));
    }
}
