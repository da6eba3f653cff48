//! Route table for the WorldViewer extension.

use crate::service::WorldViewerService;
use agentworld_server::RouteTable;
use std::sync::Arc;

/// Build the extension's route table around a service instance.
pub fn route_table(service: Arc<WorldViewerService>) -> RouteTable {
    let mut table = RouteTable::new();

    {
        let svc = service.clone();
        table = table.get("camera/status", "CAMERA_STATUS_FAILED", move |_data| {
            let svc = svc.clone();
            Box::pin(async move { svc.camera_status() })
        });
    }
    {
        let svc = service.clone();
        table = table.post(
            "camera/set_position",
            "SET_CAMERA_POSITION_FAILED",
            move |data| {
                let svc = svc.clone();
                Box::pin(async move { svc.set_camera_position(data) })
            },
        );
    }
    {
        let svc = service.clone();
        table = table.post("camera/frame_object", "FRAME_OBJECT_FAILED", move |data| {
            let svc = svc.clone();
            Box::pin(async move { svc.frame_object(data) })
        });
    }
    {
        let svc = service.clone();
        table = table.post("camera/orbit", "ORBIT_CAMERA_FAILED", move |data| {
            let svc = svc.clone();
            Box::pin(async move { svc.orbit_camera(data) })
        });
    }

    // Cinematic shot endpoints share the queue path.
    for (endpoint, operation, code) in [
        ("camera/smooth_move", "smooth_move", "SMOOTH_MOVE_FAILED"),
        ("camera/orbit_shot", "orbit_shot", "ORBIT_SHOT_FAILED"),
        ("camera/arc_shot", "arc_shot", "ARC_SHOT_FAILED"),
        ("camera/dolly_shot", "dolly_shot", "DOLLY_SHOT_FAILED"),
        ("camera/pan_tilt_shot", "pan_tilt_shot", "PAN_TILT_SHOT_FAILED"),
        ("camera/cinematic_orbit", "cinematic_orbit", "CINEMATIC_ORBIT_FAILED"),
    ] {
        let svc = service.clone();
        table = table.post(endpoint, code, move |data| {
            let svc = svc.clone();
            Box::pin(async move { svc.queue_shot(operation, data) })
        });
    }

    {
        let svc = service.clone();
        table = table.post("camera/stop_movement", "STOP_MOVEMENT_FAILED", move |_data| {
            let svc = svc.clone();
            Box::pin(async move { svc.stop_movement().await })
        });
    }
    {
        let svc = service.clone();
        table = table.get(
            "camera/movement_status",
            "MOVEMENT_STATUS_FAILED",
            move |data| {
                let svc = svc.clone();
                Box::pin(async move { svc.movement_status(data) })
            },
        );
    }
    {
        let svc = service.clone();
        table = table.get(
            "camera/shot_queue_status",
            "QUEUE_STATUS_FAILED",
            move |_data| {
                let svc = svc.clone();
                Box::pin(async move { svc.shot_queue_status() })
            },
        );
    }
    {
        let svc = service.clone();
        table = table.post("camera/queue/play", "QUEUE_PLAY_FAILED", move |_data| {
            let svc = svc.clone();
            Box::pin(async move { svc.queue_play() })
        });
    }
    {
        let svc = service.clone();
        table = table.post("camera/queue/pause", "QUEUE_PAUSE_FAILED", move |_data| {
            let svc = svc.clone();
            Box::pin(async move { svc.queue_pause() })
        });
    }
    {
        let svc = service.clone();
        table = table.post("camera/queue/stop", "QUEUE_STOP_FAILED", move |_data| {
            let svc = svc.clone();
            Box::pin(async move { svc.queue_stop() })
        });
    }
    {
        let svc = service.clone();
        table = table.get("get_asset_transform", "ASSET_TRANSFORM_FAILED", move |data| {
            let svc = svc.clone();
            Box::pin(async move { svc.asset_transform(data) })
        });
    }
    {
        let svc = service.clone();
        table = table.get("request_status", "REQUEST_STATUS_FAILED", move |data| {
            let svc = svc.clone();
            Box::pin(async move { svc.request_status(data) })
        });
    }

    table
}
