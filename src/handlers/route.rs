//! Route handlers for NATS messages

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::queries;
use crate::defaults::MAX_ROUTE_NAME_LEN;
use crate::error::{OptimizeError, CODE_DATABASE_ERROR, CODE_INVALID_REQUEST, CODE_NOT_FOUND};
use crate::services::optimizer::RouteOptimizer;
use crate::types::{
    CreateRouteRequest, ErrorResponse, ListRequest, ListResponse, OptimizeRouteRequest, Request,
    RouteDetail, RouteIdRequest, RouteProgress, SuccessResponse, UpdateRouteRequest,
};

/// Trimmed route name, 1 to 100 characters
fn validate_route_name(name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    let length = trimmed.chars().count();
    if length == 0 {
        return Err("Route name must not be empty".to_string());
    }
    if length > MAX_ROUTE_NAME_LEN {
        return Err(format!(
            "Route name is limited to {} characters, got {}",
            MAX_ROUTE_NAME_LEN, length
        ));
    }
    Ok(trimmed.to_string())
}

/// Handle fieldroute.route.create
pub async fn handle_create(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.create message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<CreateRouteRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), CODE_INVALID_REQUEST, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let name = match validate_route_name(&request.payload.name) {
            Ok(name) => name,
            Err(message) => {
                let error = ErrorResponse::new(request.id, CODE_INVALID_REQUEST, message);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let contact_ids = request.payload.contact_ids;
        match queries::contact::find_missing(&pool, &contact_ids).await {
            Ok(missing) if missing.is_empty() => {}
            Ok(missing) => {
                let error = ErrorResponse::new(
                    request.id,
                    CODE_INVALID_REQUEST,
                    format!("Unknown contacts: {:?}", missing),
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
            Err(e) => {
                error!("Failed to check contacts: {}", e);
                let error = ErrorResponse::new(request.id, CODE_DATABASE_ERROR, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        }

        match queries::route::create_route(&pool, &name, request.payload.planned_date, &contact_ids).await {
            Ok(route) => {
                info!("Created route {} with {} stops", route.id, contact_ids.len());
                let response = SuccessResponse::new(request.id, route);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to create route: {}", e);
                let error = ErrorResponse::new(request.id, CODE_DATABASE_ERROR, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle fieldroute.route.get
pub async fn handle_get(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.get message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<RouteIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), CODE_INVALID_REQUEST, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let route_id = request.payload.route_id;
        let route = match queries::route::get_route(&pool, route_id).await {
            Ok(Some(route)) => route,
            Ok(None) => {
                let error = ErrorResponse::new(request.id, CODE_NOT_FOUND, format!("Route not found: {}", route_id));
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
            Err(e) => {
                error!("Failed to get route: {}", e);
                let error = ErrorResponse::new(request.id, CODE_DATABASE_ERROR, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match queries::stop::list_route_stops(&pool, route_id).await {
            Ok(stops) => {
                let detail = RouteDetail {
                    route,
                    progress: RouteProgress::from_stops(&stops),
                    stops,
                };
                let response = SuccessResponse::new(request.id, detail);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to load route stops: {}", e);
                let error = ErrorResponse::new(request.id, CODE_DATABASE_ERROR, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle fieldroute.route.list
pub async fn handle_list(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.list message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ListRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), CODE_INVALID_REQUEST, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let limit = request.payload.limit.clamp(1, 500);
        let offset = request.payload.offset.max(0);

        match queries::route::list_routes(&pool, limit, offset).await {
            Ok((items, total)) => {
                let response = SuccessResponse::new(
                    request.id,
                    ListResponse {
                        items,
                        total,
                        limit,
                        offset,
                    },
                );
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to list routes: {}", e);
                let error = ErrorResponse::new(request.id, CODE_DATABASE_ERROR, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle fieldroute.route.update
pub async fn handle_update(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.update message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<UpdateRouteRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), CODE_INVALID_REQUEST, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let payload = request.payload;
        let name = match payload.name.as_deref().map(validate_route_name).transpose() {
            Ok(name) => name,
            Err(message) => {
                let error = ErrorResponse::new(request.id, CODE_INVALID_REQUEST, message);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match queries::route::update_route(&pool, payload.route_id, name.as_deref(), payload.status, payload.planned_date).await {
            Ok(Some(route)) => {
                let response = SuccessResponse::new(request.id, route);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Ok(None) => {
                let error = ErrorResponse::new(
                    request.id,
                    CODE_NOT_FOUND,
                    format!("Route not found: {}", payload.route_id),
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
            Err(e) => {
                error!("Failed to update route: {}", e);
                let error = ErrorResponse::new(request.id, CODE_DATABASE_ERROR, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle fieldroute.route.delete
pub async fn handle_delete(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.delete message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<RouteIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), CODE_INVALID_REQUEST, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let route_id = request.payload.route_id;
        match queries::route::delete_route(&pool, route_id).await {
            Ok(true) => {
                info!("Deleted route {}", route_id);
                let response = SuccessResponse::new(request.id, serde_json::json!({ "deleted": true }));
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Ok(false) => {
                let error = ErrorResponse::new(request.id, CODE_NOT_FOUND, format!("Route not found: {}", route_id));
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
            Err(e) => {
                error!("Failed to delete route: {}", e);
                let error = ErrorResponse::new(request.id, CODE_DATABASE_ERROR, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle fieldroute.route.optimize
pub async fn handle_optimize(
    client: Client,
    mut subscriber: Subscriber,
    optimizer: Arc<RouteOptimizer>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.optimize message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<OptimizeRouteRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), CODE_INVALID_REQUEST, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let OptimizeRouteRequest { route_id, mode } = request.payload;

        match optimizer.optimize(route_id, mode).await {
            Ok(optimized) => {
                let response = SuccessResponse::new(request.id, optimized);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                match &e {
                    OptimizeError::Persistence(_) => error!("Failed to optimize route {}: {}", route_id, e),
                    _ => warn!("Optimization of route {} rejected: {}", route_id, e),
                }
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}
