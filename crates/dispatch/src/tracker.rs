//! Async request→result mapping with TTL and capacity eviction.

use agentworld_core::{error_envelope, ErrorCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// One fire-and-forget request awaiting (or holding) its outcome.
#[derive(Debug, Clone)]
pub struct TrackedRequest {
    pub request_id: String,
    pub operation: String,
    pub params: Value,
    pub created_at: Instant,
    pub completed: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
}

/// Records requests whose results arrive asynchronously from the main
/// thread. Entries age out after the TTL; capacity overflow evicts
/// oldest-completed entries first, then the oldest outright.
pub struct RequestTracker {
    entries: Mutex<HashMap<String, TrackedRequest>>,
    ttl: Duration,
    max_entries: usize,
}

impl RequestTracker {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    /// Register a request, evicting as needed to stay within capacity.
    pub fn add(&self, request_id: &str, operation: &str, params: Value) {
        self.prune();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            request_id.to_string(),
            TrackedRequest {
                request_id: request_id.to_string(),
                operation: operation.to_string(),
                params,
                created_at: Instant::now(),
                completed: false,
                result: None,
                error: None,
            },
        );
        Self::shrink_to_capacity(&mut entries, self.max_entries);
    }

    /// Record the outcome of a request.
    pub fn mark_completed(&self, request_id: &str, outcome: Result<Value, String>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get_mut(request_id) {
            entry.completed = true;
            match outcome {
                Ok(result) => entry.result = Some(result),
                Err(error) => entry.error = Some(error),
            }
        }
    }

    /// Status envelope for a request, or a `NOT_FOUND` error once evicted.
    pub fn get(&self, request_id: &str) -> Value {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(request_id) {
            Some(entry) => {
                let mut payload = json!({
                    "success": true,
                    "request_id": entry.request_id,
                    "operation": entry.operation,
                    "completed": entry.completed,
                    "age_seconds": entry.created_at.elapsed().as_secs_f64(),
                });
                if let Some(result) = &entry.result {
                    payload["result"] = result.clone();
                }
                if let Some(error) = &entry.error {
                    payload["error"] = json!(error);
                }
                payload
            }
            None => error_envelope(
                ErrorCode::NotFound,
                format!("request not found: {request_id}"),
            ),
        }
    }

    /// Evict expired entries and shrink back under capacity.
    pub fn prune(&self) {
        self.prune_at(Instant::now());
    }

    /// Clock-injected variant used by tests.
    pub fn prune_at(&self, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| now.duration_since(entry.created_at) <= ttl);
        Self::shrink_to_capacity(&mut entries, self.max_entries);

        let evicted = before.saturating_sub(entries.len());
        if evicted > 0 {
            debug!(evicted, remaining = entries.len(), "Pruned request tracker");
        }
    }

    /// Evict oldest-completed entries first, then the oldest outright.
    fn shrink_to_capacity(entries: &mut HashMap<String, TrackedRequest>, max_entries: usize) {
        while entries.len() > max_entries {
            let victim = entries
                .values()
                .filter(|e| e.completed)
                .min_by_key(|e| e.created_at)
                .or_else(|| entries.values().min_by_key(|e| e.created_at))
                .map(|e| e.request_id.clone());
            match victim {
                Some(id) => {
                    entries.remove(&id);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new(500, Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_add_complete_get() {
        let tracker = RequestTracker::default();
        tracker.add("req_1", "set_position", json!({"position": [0, 0, 0]}));

        let pending = tracker.get("req_1");
        assert_eq!(pending["completed"], false);

        tracker.mark_completed("req_1", Ok(json!({"success": true, "position": [0, 0, 0]})));
        let done = tracker.get("req_1");
        assert_eq!(done["completed"], true);
        assert_eq!(done["result"]["position"][0], 0);
    }

    #[test]
    fn error_outcomes_are_recorded() {
        let tracker = RequestTracker::default();
        tracker.add("req_1", "frame_object", json!({}));
        tracker.mark_completed("req_1", Err("object not found".into()));
        let status = tracker.get("req_1");
        assert_eq!(status["completed"], true);
        assert_eq!(status["error"], "object not found");
    }

    #[test]
    fn unknown_request_reports_not_found() {
        let tracker = RequestTracker::default();
        let status = tracker.get("missing");
        assert_eq!(status["success"], false);
        assert_eq!(status["error_code"], "NOT_FOUND");
    }

    #[test]
    fn ttl_expiry_evicts_entries() {
        let tracker = RequestTracker::new(500, Duration::from_secs(300));
        tracker.add("req_1", "orbit", json!({}));
        assert_eq!(tracker.len(), 1);

        tracker.prune_at(Instant::now() + Duration::from_secs(301));
        assert!(tracker.is_empty());
        assert_eq!(tracker.get("req_1")["error_code"], "NOT_FOUND");
    }

    #[test]
    fn capacity_evicts_completed_before_pending() {
        let tracker = RequestTracker::new(2, Duration::from_secs(300));
        tracker.add("old_completed", "op", json!({}));
        tracker.mark_completed("old_completed", Ok(json!({"success": true})));
        std::thread::sleep(Duration::from_millis(5));
        tracker.add("old_pending", "op", json!({}));
        std::thread::sleep(Duration::from_millis(5));
        tracker.add("new_pending", "op", json!({}));

        // Third add pruned down to capacity: the completed entry went first.
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.get("old_completed")["error_code"], "NOT_FOUND");
        assert_eq!(tracker.get("old_pending")["completed"], false);
        assert_eq!(tracker.get("new_pending")["completed"], false);
    }

    #[test]
    fn capacity_falls_back_to_oldest_when_none_completed() {
        let tracker = RequestTracker::new(2, Duration::from_secs(300));
        tracker.add("a", "op", json!({}));
        std::thread::sleep(Duration::from_millis(5));
        tracker.add("b", "op", json!({}));
        std::thread::sleep(Duration::from_millis(5));
        tracker.add("c", "op", json!({}));

        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.get("a")["error_code"], "NOT_FOUND");
        assert_eq!(tracker.get("b")["completed"], false);
    }
}
