//! NATS message handlers

pub mod contact;
pub mod ping;
pub mod route;
pub mod stop;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_nats::Client;
use sqlx::PgPool;
use tokio::select;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::{PgRouteStore, RouteStore};
use crate::services::activity::{ActivityLog, PgActivityLog};
use crate::services::optimizer::RouteOptimizer;
use crate::services::rate_limiter::RateLimiter;
use crate::services::routing::{DirectionsAdapter, GoogleDirectionsClient, GoogleDirectionsConfig};
use crate::services::stop_lifecycle::StopLifecycle;

/// Build the directions adapter when a key is configured
fn create_directions_adapter(config: &Config) -> Result<Option<DirectionsAdapter>> {
    let Some(api_key) = config.google_maps_key.clone() else {
        warn!("GOOGLE_MAPS_SERVER_KEY not set, fastest mode will use nearest neighbor");
        return Ok(None);
    };

    let client = GoogleDirectionsClient::new(GoogleDirectionsConfig {
        base_url: config.directions_url.clone(),
        api_key,
    })?;

    Ok(Some(DirectionsAdapter::new(
        Arc::new(client),
        config.directions_timeout,
        config.heuristic_speed_mps,
    )))
}

/// Start all message handlers
pub async fn start_handlers(client: Client, pool: PgPool, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    let store: Arc<dyn RouteStore> = Arc::new(PgRouteStore::new(pool.clone()));
    let activity: Arc<dyn ActivityLog> = Arc::new(PgActivityLog::new(pool.clone()));

    let directions = create_directions_adapter(config)?;
    if let Some(adapter) = &directions {
        info!(
            "Directions provider initialized: {} (timeout {:?})",
            adapter.provider_name(),
            config.directions_timeout
        );
    }

    let limiter = Arc::new(RateLimiter::new(config.optimize_rate_limit, config.optimize_rate_window));
    let optimizer = Arc::new(
        RouteOptimizer::new(store.clone(), directions, config.heuristic_speed_mps).with_rate_limiter(limiter.clone()),
    );
    let lifecycle = Arc::new(StopLifecycle::new(store, activity));

    // Subscribe to all subjects
    let ping_sub = client.subscribe("fieldroute.ping").await?;
    let route_create_sub = client.subscribe("fieldroute.route.create").await?;
    let route_get_sub = client.subscribe("fieldroute.route.get").await?;
    let route_list_sub = client.subscribe("fieldroute.route.list").await?;
    let route_update_sub = client.subscribe("fieldroute.route.update").await?;
    let route_delete_sub = client.subscribe("fieldroute.route.delete").await?;
    let route_optimize_sub = client.subscribe("fieldroute.route.optimize").await?;
    let stop_status_sub = client.subscribe("fieldroute.stop.status").await?;
    let stop_update_sub = client.subscribe("fieldroute.stop.update").await?;
    let stop_delete_sub = client.subscribe("fieldroute.stop.delete").await?;
    let contact_corridor_sub = client.subscribe("fieldroute.contact.corridor").await?;

    info!("Subscribed to NATS subjects");

    let client_ping = client.clone();
    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub).await
    });

    let client_route_create = client.clone();
    let pool_route_create = pool.clone();
    let route_create_handle = tokio::spawn(async move {
        route::handle_create(client_route_create, route_create_sub, pool_route_create).await
    });

    let client_route_get = client.clone();
    let pool_route_get = pool.clone();
    let route_get_handle = tokio::spawn(async move {
        route::handle_get(client_route_get, route_get_sub, pool_route_get).await
    });

    let client_route_list = client.clone();
    let pool_route_list = pool.clone();
    let route_list_handle = tokio::spawn(async move {
        route::handle_list(client_route_list, route_list_sub, pool_route_list).await
    });

    let client_route_update = client.clone();
    let pool_route_update = pool.clone();
    let route_update_handle = tokio::spawn(async move {
        route::handle_update(client_route_update, route_update_sub, pool_route_update).await
    });

    let client_route_delete = client.clone();
    let pool_route_delete = pool.clone();
    let route_delete_handle = tokio::spawn(async move {
        route::handle_delete(client_route_delete, route_delete_sub, pool_route_delete).await
    });

    let client_route_optimize = client.clone();
    let route_optimize_handle = tokio::spawn(async move {
        route::handle_optimize(client_route_optimize, route_optimize_sub, optimizer).await
    });

    let client_stop_status = client.clone();
    let lifecycle_status = lifecycle.clone();
    let stop_status_handle = tokio::spawn(async move {
        stop::handle_set_status(client_stop_status, stop_status_sub, lifecycle_status).await
    });

    let client_stop_update = client.clone();
    let stop_update_handle = tokio::spawn(async move {
        stop::handle_update(client_stop_update, stop_update_sub, lifecycle).await
    });

    let client_stop_delete = client.clone();
    let pool_stop_delete = pool.clone();
    let stop_delete_handle = tokio::spawn(async move {
        stop::handle_delete(client_stop_delete, stop_delete_sub, pool_stop_delete).await
    });

    let client_contact_corridor = client.clone();
    let contact_corridor_handle = tokio::spawn(async move {
        contact::handle_corridor(client_contact_corridor, contact_corridor_sub, pool).await
    });

    // Expired throttle windows
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.cleanup();
        }
    });

    info!("All handlers started");

    // Any handler finishing means its subscription is gone
    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = route_create_handle => {
            error!("Route create handler finished: {:?}", result);
        }
        result = route_get_handle => {
            error!("Route get handler finished: {:?}", result);
        }
        result = route_list_handle => {
            error!("Route list handler finished: {:?}", result);
        }
        result = route_update_handle => {
            error!("Route update handler finished: {:?}", result);
        }
        result = route_delete_handle => {
            error!("Route delete handler finished: {:?}", result);
        }
        result = route_optimize_handle => {
            error!("Route optimize handler finished: {:?}", result);
        }
        result = stop_status_handle => {
            error!("Stop status handler finished: {:?}", result);
        }
        result = stop_update_handle => {
            error!("Stop update handler finished: {:?}", result);
        }
        result = stop_delete_handle => {
            error!("Stop delete handler finished: {:?}", result);
        }
        result = contact_corridor_handle => {
            error!("Contact corridor handler finished: {:?}", result);
        }
    }

    Ok(())
}
