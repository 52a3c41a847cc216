use crate::config::DatabaseConfig;
use crate::models::{item::Item, user::User};
use crate::storage::{
    ItemProvider, ItemSaver, StorageError, StorageHealth, UserProvider, UserSaver,
};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub type DB = PgPool;

// Postgres SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Opens the connection pool and makes sure the two tables exist.
pub async fn connect(config: &DatabaseConfig) -> Result<DB, StorageError> {
    // 1. Connect
    let db = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .map_err(|e| StorageError::database("db.connect", e))?;

    // 2. Ping
    // connect() is lazy about some failures. A round trip tells us for sure.
    sqlx::query("SELECT 1")
        .execute(&db)
        .await
        .map_err(|e| StorageError::database("db.ping", e))?;

    // 3. Tables
    // Not a migration system. Just enough DDL that a fresh database works.
    ensure_schema(&db).await?;

    Ok(db)
}

async fn ensure_schema(db: &DB) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            BIGSERIAL PRIMARY KEY,
            email         TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL
        )
        "#,
    )
    .execute(db)
    .await
    .map_err(|e| StorageError::database("db.ensure_schema.users", e))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id          BIGSERIAL PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT NOT NULL,
            owner_id    BIGINT NOT NULL REFERENCES users(id)
        )
        "#,
    )
    .execute(db)
    .await
    .map_err(|e| StorageError::database("db.ensure_schema.items", e))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS items_owner_id_idx ON items (owner_id)")
        .execute(db)
        .await
        .map_err(|e| StorageError::database("db.ensure_schema.index", e))?;

    Ok(())
}

/// Postgres-backed implementation of every storage capability.
#[derive(Clone)]
pub struct PgStore {
    db: DB,
}

impl PgStore {
    pub fn new(db: DB) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserSaver for PgStore {
    async fn save_user(&self, email: &str, password_hash: &str) -> Result<i64, StorageError> {
        // We rely on the UNIQUE(email) constraint instead of a check-then-insert,
        // which would race with a concurrent sign-up for the same address.
        let created = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await;

        match created {
            Ok(id) => Ok(id),
            Err(e) => {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                        return Err(StorageError::UserExists);
                    }
                }
                Err(StorageError::database("postgres.save_user", e))
            }
        }
    }
}

#[async_trait]
impl UserProvider for PgStore {
    async fn user(&self, email: &str) -> Result<User, StorageError> {
        sqlx::query_as::<_, User>("SELECT id, email, password_hash FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| StorageError::database("postgres.user", e))?
            .ok_or(StorageError::UserNotFound)
    }
}

#[async_trait]
impl ItemSaver for PgStore {
    async fn save_item(
        &self,
        owner_id: i64,
        title: &str,
        description: &str,
    ) -> Result<i64, StorageError> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO items (title, description, owner_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(title)
        .bind(description)
        .bind(owner_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| StorageError::database("postgres.save_item", e))
    }
}

#[async_trait]
impl ItemProvider for PgStore {
    async fn items(&self, owner_id: i64) -> Result<Vec<Item>, StorageError> {
        sqlx::query_as::<_, Item>(
            "SELECT id, title, description, owner_id FROM items WHERE owner_id = $1 ORDER BY id",
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| StorageError::database("postgres.items", e))
    }
}

#[async_trait]
impl StorageHealth for PgStore {
    async fn ping(&self) -> Result<(), StorageError> {
        // `SELECT 1` is the fastest way to check the pool can still hand out a connection.
        sqlx::query("SELECT 1")
            .execute(&self.db)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::database("postgres.ping", e))
    }
}
