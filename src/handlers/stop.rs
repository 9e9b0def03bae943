//! Stop handlers for NATS messages

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::queries;
use crate::error::{StopError, CODE_DATABASE_ERROR, CODE_INVALID_REQUEST, CODE_NOT_FOUND};
use crate::services::stop_lifecycle::StopLifecycle;
use crate::types::{ErrorResponse, Request, SetStopStatusRequest, StopIdRequest, SuccessResponse, UpdateStopMetaRequest};

fn log_stop_error(action: &str, stop_id: Uuid, e: &StopError) {
    match e {
        StopError::Persistence(_) => error!("Failed to {} stop {}: {}", action, stop_id, e),
        _ => debug!("Rejected {} of stop {}: {}", action, stop_id, e),
    }
}

/// Handle fieldroute.stop.status
pub async fn handle_set_status(client: Client, mut subscriber: Subscriber, lifecycle: Arc<StopLifecycle>) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received stop.status message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<SetStopStatusRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), CODE_INVALID_REQUEST, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let SetStopStatusRequest { route_id, stop_id, status, notes } = request.payload;

        match lifecycle.set_status(route_id, stop_id, status, notes).await {
            Ok(stop) => {
                let response = SuccessResponse::new(request.id, stop);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                log_stop_error("set status of", stop_id, &e);
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle fieldroute.stop.update
pub async fn handle_update(client: Client, mut subscriber: Subscriber, lifecycle: Arc<StopLifecycle>) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received stop.update message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<UpdateStopMetaRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), CODE_INVALID_REQUEST, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let UpdateStopMetaRequest { route_id, stop_id, patch } = request.payload;

        match lifecycle.update_meta(route_id, stop_id, patch).await {
            Ok(stop) => {
                let response = SuccessResponse::new(request.id, stop);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                log_stop_error("update", stop_id, &e);
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle fieldroute.stop.delete
pub async fn handle_delete(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received stop.delete message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<StopIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), CODE_INVALID_REQUEST, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let StopIdRequest { route_id, stop_id } = request.payload;

        match queries::stop::delete_stop(&pool, route_id, stop_id).await {
            Ok(true) => {
                info!("Removed stop {} from route {}", stop_id, route_id);
                let response = SuccessResponse::new(request.id, serde_json::json!({ "deleted": true }));
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Ok(false) => {
                let error = ErrorResponse::new(
                    request.id,
                    CODE_NOT_FOUND,
                    format!("Stop {} not found on route {}", stop_id, route_id),
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
            Err(e) => {
                error!("Failed to delete stop: {}", e);
                let error = ErrorResponse::new(request.id, CODE_DATABASE_ERROR, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}
