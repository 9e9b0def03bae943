//! Contact handlers for NATS messages

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use sqlx::PgPool;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::db::queries;
use crate::error::{CODE_DATABASE_ERROR, CODE_INVALID_REQUEST};
use crate::services::geo::{self, BoundingBox};
use crate::types::{Coordinates, CorridorRequest, CorridorResponse, ErrorResponse, Request, SuccessResponse};

fn validate_corridor(request: &CorridorRequest) -> Result<(), String> {
    for (label, point) in [("start", request.start), ("end", request.end)] {
        if Coordinates::from_parts(Some(point.lat), Some(point.lng)).is_none() {
            return Err(format!("Invalid {} coordinates: {}, {}", label, point.lat, point.lng));
        }
    }
    if !(request.radius_km.is_finite() && request.radius_km > 0.0) {
        return Err(format!("radiusKm must be positive, got {}", request.radius_km));
    }
    Ok(())
}

/// Handle fieldroute.contact.corridor
pub async fn handle_corridor(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received contact.corridor message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<CorridorRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), CODE_INVALID_REQUEST, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let corridor = request.payload;
        if let Err(message) = validate_corridor(&corridor) {
            let error = ErrorResponse::new(request.id, CODE_INVALID_REQUEST, message);
            let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            continue;
        }

        let bounds = BoundingBox::around_segment(&corridor.start, &corridor.end, corridor.radius_km);
        match queries::contact::list_geocoded_in_box(&pool, &bounds).await {
            Ok(candidates) => {
                let mut contacts = geo::contacts_in_corridor(candidates, &corridor.start, &corridor.end, corridor.radius_km);
                if let Some(limit) = corridor.limit {
                    contacts.truncate(limit);
                }
                debug!("Corridor matched {} contacts", contacts.len());
                let response = SuccessResponse::new(request.id, CorridorResponse { contacts });
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to load contacts: {}", e);
                let error = ErrorResponse::new(request.id, CODE_DATABASE_ERROR, e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor(radius_km: f64, end_lat: f64) -> CorridorRequest {
        CorridorRequest {
            start: Coordinates::new(50.0, 14.0),
            end: Coordinates::new(end_lat, 14.5),
            radius_km,
            limit: None,
        }
    }

    #[test]
    fn test_valid_corridor() {
        assert!(validate_corridor(&corridor(8.0, 50.2)).is_ok());
    }

    #[test]
    fn test_rejects_bad_radius() {
        assert!(validate_corridor(&corridor(0.0, 50.2)).is_err());
        assert!(validate_corridor(&corridor(-1.0, 50.2)).is_err());
        assert!(validate_corridor(&corridor(f64::INFINITY, 50.2)).is_err());
    }

    #[test]
    fn test_rejects_bad_coordinates() {
        let err = validate_corridor(&corridor(8.0, 95.0)).unwrap_err();
        assert!(err.contains("end"));
    }
}
