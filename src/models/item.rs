use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing)]
    pub owner_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}
