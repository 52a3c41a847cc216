use crate::error::ApiError;
use crate::handlers::{decode_json, request_id};
use crate::models::user::CredentialsRequest;
use crate::services::auth::AuthError;
use crate::state::AppState;
use crate::utils::validation::FieldErrors;
use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde_json::{Value, json};
use tracing::Instrument;

/// Decodes and validates `{email, password}`. Shared by sign-up and sign-in.
fn credentials(op: &'static str, rid: &str, body: &Bytes) -> Result<CredentialsRequest, ApiError> {
    let req: CredentialsRequest = decode_json(body).map_err(|(err, cause)| {
        match cause {
            Some(e) => tracing::error!(op, request_id = %rid, error = %e, "failed to decode request body"),
            None => tracing::error!(op, request_id = %rid, "request body is empty"),
        }
        err
    })?;

    tracing::info!(op, request_id = %rid, req = ?req, "request body decoded");

    FieldErrors::new()
        .email("email", &req.email)
        .required("password", &req.password)
        .finish()
        .map_err(|msg| {
            tracing::error!(op, request_id = %rid, error = %msg, "invalid request");
            ApiError::Validation(msg)
        })?;

    Ok(req)
}

/// POST /auth/sign-up
///
/// Creates the account. Doesn't log you in; that's what sign-in is for.
/// Any service failure (including "email taken") is a 500 with a fixed message.
pub async fn sign_up(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    const OP: &str = "handlers.auth.sign_up";
    let rid = request_id(&headers);

    let req = credentials(OP, &rid, &body)?;

    let user_id = state
        .auth
        .register(&req.email, &req.password)
        .instrument(tracing::info_span!("register", request_id = %rid))
        .await
        .map_err(|e| {
            tracing::error!(op = OP, request_id = %rid, error = %e, "failed to register new user");
            ApiError::Internal("failed to register new user")
        })?;

    tracing::info!(op = OP, request_id = %rid, user_id, "user successfully registered");

    Ok(Json(json!({"status": "OK", "msg": "You successfully registered"})))
}

/// POST /auth/sign-in
///
/// Unknown email and wrong password produce the exact same response.
/// No point telling an attacker which half they got right.
pub async fn sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    const OP: &str = "handlers.auth.sign_in";
    let rid = request_id(&headers);

    let req = credentials(OP, &rid, &body)?;

    let token = state
        .auth
        .login(&req.email, &req.password)
        .instrument(tracing::info_span!("login", request_id = %rid))
        .await
        .map_err(|e| {
            match &e {
                AuthError::UserNotFound | AuthError::InvalidCredentials => {
                    tracing::warn!(op = OP, request_id = %rid, error = %e, "invalid email or password")
                }
                _ => tracing::error!(op = OP, request_id = %rid, error = %e, "login failed"),
            }
            ApiError::Internal("invalid email or password")
        })?;

    // The token itself stays out of the logs.
    tracing::info!(op = OP, request_id = %rid, "user got token");

    Ok(Json(json!({"status": "OK", "msg": "You got token", "token": token})))
}
