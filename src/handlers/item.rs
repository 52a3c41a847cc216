use crate::error::ApiError;
use crate::handlers::{decode_json, request_id};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::item::{CreateItemRequest, Item};
use crate::state::AppState;
use crate::utils::validation::FieldErrors;
use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde_json::{Value, json};
use tracing::Instrument;

/// POST /api/items
///
/// The owner is always the caller. There's no field for it in the body, so you
/// can't file things under someone else's account.
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    const OP: &str = "handlers.item.create_item";
    let rid = request_id(&headers);

    // 1. Decode
    let req: CreateItemRequest = decode_json(&body).map_err(|(err, cause)| {
        match cause {
            Some(e) => tracing::error!(op = OP, request_id = %rid, error = %e, "failed to decode request body"),
            None => tracing::error!(op = OP, request_id = %rid, "request body is empty"),
        }
        err
    })?;

    // 2. Validate
    FieldErrors::new()
        .required("title", &req.title)
        .required("description", &req.description)
        .finish()
        .map_err(|msg| {
            tracing::error!(op = OP, request_id = %rid, error = %msg, "invalid request");
            ApiError::Validation(msg)
        })?;

    // 3. Persist
    let item_id = state
        .items
        .create_item(user.user_id, &req.title, &req.description)
        .instrument(tracing::info_span!("create_item", request_id = %rid))
        .await
        .map_err(|e| {
            tracing::error!(op = OP, request_id = %rid, error = %e, "failed to create item");
            ApiError::Internal("failed to create item")
        })?;

    tracing::info!(op = OP, request_id = %rid, item_id, user_id = user.user_id, email = %user.email, "item created");

    Ok(Json(json!({"status": "OK", "msg": "Item successfully created"})))
}

/// GET /api/items
///
/// Everything the caller owns, oldest first. No items is `[]`, not a 404.
pub async fn list_items(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<Json<Vec<Item>>, ApiError> {
    const OP: &str = "handlers.item.list_items";
    let rid = request_id(&headers);

    let items = state
        .items
        .list_items(user.user_id)
        .instrument(tracing::info_span!("list_items", request_id = %rid))
        .await
        .map_err(|e| {
            tracing::error!(op = OP, request_id = %rid, error = %e, "failed to get items");
            ApiError::Internal("failed to get items")
        })?;

    tracing::info!(op = OP, request_id = %rid, user_id = user.user_id, email = %user.email, count = items.len(), "listed items");

    Ok(Json(items))
}
