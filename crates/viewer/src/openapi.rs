//! OpenAPI document for the WorldViewer HTTP surface.

use agentworld_core::ExtensionIdentity;
use serde_json::{json, Map, Value};

/// `(endpoint, method, summary)` for every route, standard set included.
const OPERATIONS: &[(&str, &str, &str)] = &[
    ("/health", "get", "Service health and identity"),
    ("/metrics", "get", "Metrics snapshot (JSON)"),
    ("/metrics.prom", "get", "Metrics in Prometheus text exposition"),
    ("/status", "get", "Liveness check"),
    ("/camera/status", "get", "Current camera pose"),
    ("/camera/set_position", "post", "Set camera position and target"),
    ("/camera/frame_object", "post", "Frame a scene object"),
    ("/camera/orbit", "post", "Reposition on an orbit sphere"),
    ("/camera/smooth_move", "post", "Queue a smooth movement"),
    ("/camera/orbit_shot", "post", "Queue an orbital shot"),
    ("/camera/arc_shot", "post", "Queue a curved arc shot"),
    ("/camera/dolly_shot", "post", "Queue a dolly shot"),
    ("/camera/pan_tilt_shot", "post", "Queue a pan/tilt shot"),
    ("/camera/cinematic_orbit", "post", "Queue a cinematic orbit"),
    ("/camera/stop_movement", "post", "Stop the active movement"),
    ("/camera/movement_status", "get", "Status of one movement"),
    ("/camera/shot_queue_status", "get", "Shot queue status"),
    ("/camera/queue/play", "post", "Start or resume the shot queue"),
    ("/camera/queue/pause", "post", "Pause the shot queue"),
    ("/camera/queue/stop", "post", "Stop and clear the shot queue"),
    ("/get_asset_transform", "get", "World transform of an asset"),
    ("/request_status", "get", "Outcome of a queued camera request"),
];

/// Build the OpenAPI 3 document served by `/docs` and `/openapi.json`.
pub fn build_openapi_document(identity: &ExtensionIdentity) -> Value {
    let mut paths = Map::new();
    for (path, method, summary) in OPERATIONS {
        let entry = paths
            .entry(path.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(item) = entry {
            item.insert(
                method.to_string(),
                json!({
                    "summary": summary,
                    "responses": {
                        "200": {"description": "Success envelope"},
                        "400": {"description": "Validation error"},
                        "401": {"description": "Authentication required"},
                        "429": {"description": "Rate limit exceeded"},
                    },
                }),
            );
        }
    }

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": identity.service_name,
            "version": identity.api_version,
            "description": "Camera control and cinematic shot queue for the simulation viewport",
        },
        "servers": [{"url": identity.base_url()}],
        "paths": Value::Object(paths),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_has_openapi_field_and_routes() {
        let identity = ExtensionIdentity::new("worldviewer", 8900);
        let document = build_openapi_document(&identity);
        assert_eq!(document["openapi"], "3.0.3");
        assert!(document["paths"]["/camera/smooth_move"]["post"].is_object());
        assert!(document["paths"]["/health"]["get"].is_object());
        assert_eq!(document["servers"][0]["url"], "http://localhost:8900");
    }
}
