use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::{stream, Stream};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::models::*;
use crate::store::{is_valid_vault_name, StoreError};
use crate::vault::{find_seed, SeedAttributes, VaultKind};

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn not_found(message: impl Into<String>) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// Log why a lookup failed and answer with a plain 404.
///
/// Missing and corrupt documents look the same to the client; only the
/// server log tells them apart.
fn lookup_failed(message: &'static str, e: StoreError) -> ApiError {
    if e.is_missing() {
        tracing::debug!("{}: {}", message, e);
    } else {
        tracing::error!("{}: {}", message, e);
    }
    not_found(message)
}

pub async fn fallback() -> ApiError {
    not_found("Not found")
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(HealthStatus::ok())
}

// ============================================================
// Live updates
// ============================================================

/// Server-push stream: a `connected` frame, then one frame per change.
///
/// The update channel lives inside the response stream, so a client
/// disconnect drops it and unregisters the subscriber.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let channel = state.broadcaster.open_channel();

    let frames = stream::unfold(channel, |mut channel| async move {
        let frame = channel.next_frame().await?;
        Some((Event::default().json_data(&frame), channel))
    });

    Sse::new(frames).keep_alive(KeepAlive::default())
}

// ============================================================
// Vaults
// ============================================================

pub async fn list_vaults(State(state): State<AppState>) -> Json<VaultList> {
    Json(VaultList {
        vaults: state.store.list_vaults().await,
    })
}

pub async fn get_vault(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<VaultContent>, ApiError> {
    if !is_valid_vault_name(&name) {
        return Err(not_found("Not found"));
    }

    let content = state
        .store
        .get_vault(&name)
        .await
        .map_err(|e| lookup_failed("Vault not found", e))?;

    Ok(Json(VaultContent { name, content }))
}

pub async fn list_seeds(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SeedList>, ApiError> {
    if !is_valid_vault_name(&name) {
        return Err(not_found("Not found"));
    }

    let content = state
        .store
        .get_vault(&name)
        .await
        .map_err(|e| lookup_failed("Vault not found", e))?;

    let kind = VaultKind::detect(&content);
    let seeds = kind.seed_names(&content);
    Ok(Json(SeedList { name, kind, seeds }))
}

pub async fn get_seed(
    State(state): State<AppState>,
    Path((vault, seed)): Path<(String, String)>,
) -> Result<Json<SeedDetail>, ApiError> {
    if !is_valid_vault_name(&vault) {
        return Err(not_found("Not found"));
    }

    let content = state
        .store
        .get_vault(&vault)
        .await
        .map_err(|e| lookup_failed("Vault not found", e))?;

    let found = find_seed(&content, &seed).ok_or_else(|| not_found("Seed not found"))?;

    Ok(Json(SeedDetail {
        container: found.container.map(str::to_string),
        attributes: SeedAttributes::from_seed(found.value),
        raw: found.value.clone(),
        vault,
        name: seed,
    }))
}

// ============================================================
// Decisions
// ============================================================

pub async fn list_decisions(State(state): State<AppState>) -> Json<DecisionList> {
    Json(DecisionList {
        decisions: state.store.list_decisions().await,
    })
}

pub async fn get_decision(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DecisionContent>, ApiError> {
    let content = state
        .store
        .get_decision(&id)
        .await
        .map_err(|e| lookup_failed("Decision not found", e))?;

    Ok(Json(DecisionContent { id, content }))
}
