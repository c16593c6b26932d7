//! Admin API handlers

use axum::{Json, extract::State};
use serde::Serialize;

use crate::auth::AdminUser;
use crate::core::ServerState;
use crate::orders::PendingReconciliation;
use crate::utils::AppResult;

/// Charges whose order commit failed; each needs a manual refund or
/// a manually created order
pub async fn list_reconciliations(
    State(state): State<ServerState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<PendingReconciliation>>> {
    let entries = state.manager.pending_reconciliations()?;
    Ok(Json(entries))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelClient {
    pub id: String,
    pub addr: Option<String>,
}

/// Currently connected event channel subscribers
pub async fn list_channel_clients(
    State(state): State<ServerState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<ChannelClient>>> {
    let clients = state
        .bus
        .connected_clients()
        .into_iter()
        .map(|c| ChannelClient {
            id: c.id,
            addr: c.addr,
        })
        .collect();
    Ok(Json(clients))
}
