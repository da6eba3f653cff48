//! Request pipeline: security gate, decoding, standard endpoints, route
//! dispatch, and envelope encoding.

use crate::table::{RouteMethod, RouteTable};
use agentworld_core::{
    envelope::{collapse_query_params, unix_timestamp, ResponsePayload, DEFAULT_RAW_CONTENT_TYPE},
    error_envelope, normalize_transport_response, ErrorCode, HandlerError, RequestData,
    SecurityRejection,
};
use agentworld_core::ExtensionApi;
use agentworld_config::HttpConfig;
use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::Response,
    Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Maximum accepted request body (1 MB).
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state for one extension's server.
#[derive(Clone)]
pub struct ServerState {
    pub api: Arc<dyn ExtensionApi>,
    pub routes: Arc<RouteTable>,
    pub http: Arc<HttpConfig>,
}

impl ServerState {
    pub fn new(api: Arc<dyn ExtensionApi>, routes: RouteTable, http: HttpConfig) -> Self {
        Self {
            api,
            routes: Arc::new(routes),
            http: Arc::new(http),
        }
    }
}

/// Build the Axum router for one extension.
///
/// A single fallback handler performs routing so the extension's route
/// table stays data, not axum wiring; the header layer stamps CORS and
/// security headers on every response including errors.
pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(middleware::from_fn_with_state(state.clone(), apply_headers))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

// ── Header layer ────────────────────────────────────────────────────────────

/// Attach security and CORS headers to every response. 401 responses also
/// carry the HMAC challenge for this extension's realm.
async fn apply_headers(State(state): State<ServerState>, req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    let sec = &state.http.security_headers;
    insert_header(headers, "Content-Security-Policy", &sec.content_security_policy);
    insert_header(headers, "X-Content-Type-Options", &sec.x_content_type_options);
    insert_header(headers, "X-Frame-Options", &sec.x_frame_options);
    insert_header(headers, "X-XSS-Protection", &sec.x_xss_protection);
    insert_header(headers, "Referrer-Policy", &sec.referrer_policy);
    insert_header(headers, "Permissions-Policy", &sec.permissions_policy);
    if sec.enable_hsts {
        insert_header(headers, "Strict-Transport-Security", &sec.hsts_max_age);
    }

    let cors = &state.http.cors_headers;
    insert_header(headers, "Access-Control-Allow-Origin", &cors.access_control_allow_origin);
    insert_header(headers, "Vary", &cors.vary_header);

    if response.status() == StatusCode::UNAUTHORIZED {
        let challenge = format!("HMAC-SHA256 realm=\"{}\"", state.api.identity().auth_realm());
        insert_header(response.headers_mut(), "WWW-Authenticate", &challenge);
    }

    response
}

fn insert_header(headers: &mut axum::http::HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

// ── Dispatch ────────────────────────────────────────────────────────────────

/// Route a request through the full pipeline.
async fn dispatch(State(state): State<ServerState>, req: Request) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let endpoint = uri.path().trim_matches('/').to_string();
    // The HMAC message covers the request target as sent, query included.
    let signed_path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    if method == Method::OPTIONS {
        return preflight(&state);
    }

    if let Some(metrics) = state.api.metrics() {
        metrics.increment_requests();
        metrics.increment_endpoint(&endpoint);
    }

    let client_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "127.0.0.1".to_string());

    if let Some(gate) = state.api.security() {
        let request_headers = lower_headers(req.headers());
        match gate.validate_request(&request_headers, &client_ip, method.as_str(), &signed_path) {
            Ok(()) => {}
            Err(SecurityRejection::RateLimited) => {
                if let Some(metrics) = state.api.metrics() {
                    metrics.increment_rate_limited();
                }
                return encode_json(
                    &state,
                    error_envelope(ErrorCode::RateLimited, "Rate limit exceeded"),
                    StatusCode::TOO_MANY_REQUESTS,
                );
            }
            Err(SecurityRejection::Unauthorized(message)) => {
                if let Some(metrics) = state.api.metrics() {
                    metrics.increment_auth_failures();
                }
                return encode_json(
                    &state,
                    error_envelope(ErrorCode::Unauthorized, message),
                    StatusCode::UNAUTHORIZED,
                );
            }
        }
    }

    let started = Instant::now();
    let value = if method == Method::GET {
        let data = decode_query(uri.query());
        handle_get(&state, &endpoint, data).await
    } else if method == Method::POST {
        match decode_body(&state, req).await {
            Ok(data) => handle_post(&state, &endpoint, data).await,
            Err(response) => return response,
        }
    } else {
        error_envelope(ErrorCode::MethodNotAllowed, "Method not allowed")
    };

    let response = finish(&state, &endpoint, value);

    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
    if let Some(metrics) = state.api.metrics() {
        metrics.record_request_duration_ms(duration_ms);
        if response.status().is_server_error() {
            metrics.increment_errors();
        }
    }
    if state.http.json_logging {
        info!(
            target: "agentworld_server::access",
            "{}",
            serde_json::json!({
                "ts": unix_timestamp(),
                "method": method.as_str(),
                "endpoint": endpoint,
                "duration_ms": duration_ms,
                "status": response.status().as_u16(),
            })
        );
    }

    response
}

/// CORS preflight: 200 with the configured allow lists. The header layer
/// contributes allow-origin, Vary, and the security headers.
fn preflight(state: &ServerState) -> Response {
    let cors = &state.http.cors_headers;
    let mut response = Response::builder()
        .status(StatusCode::OK)
        .body(Body::empty())
        .unwrap_or_default();
    let headers = response.headers_mut();
    insert_header(headers, "Access-Control-Allow-Methods", &cors.access_control_allow_methods);
    insert_header(headers, "Access-Control-Allow-Headers", &cors.access_control_allow_headers);
    insert_header(headers, "Access-Control-Max-Age", &cors.access_control_max_age);
    response
}

fn lower_headers(headers: &axum::http::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

/// Decode query parameters; single-element lists collapse to scalars.
fn decode_query(query: Option<&str>) -> RequestData {
    let mut params: HashMap<String, Vec<String>> = HashMap::new();
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.entry(key.into_owned()).or_default().push(value.into_owned());
        }
    }
    collapse_query_params(params)
}

/// Decode a POST body as a JSON object; malformed JSON is a 400.
async fn decode_body(state: &ServerState, req: Request) -> Result<RequestData, Response> {
    let bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
        .await
        .unwrap_or_default();
    if bytes.is_empty() {
        return Ok(RequestData::new());
    }
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        _ => {
            let envelope = error_envelope(ErrorCode::Validation, "Invalid JSON");
            Err(encode_json(state, envelope, StatusCode::BAD_REQUEST))
        }
    }
}

async fn handle_get(state: &ServerState, endpoint: &str, data: RequestData) -> Value {
    match endpoint {
        "health" => health_endpoint(state),
        "metrics" | "metrics.json" => metrics_json(state),
        "metrics.prom" => metrics_prometheus(state),
        "docs" | "openapi.json" => openapi_endpoint(state),
        "status" | "ping" => status_endpoint(state),
        _ => run_route(state, endpoint, RouteMethod::Get, data).await,
    }
}

async fn handle_post(state: &ServerState, endpoint: &str, data: RequestData) -> Value {
    run_route(state, endpoint, RouteMethod::Post, data).await
}

async fn run_route(
    state: &ServerState,
    endpoint: &str,
    method: RouteMethod,
    data: RequestData,
) -> Value {
    let Some(route) = state.routes.lookup(endpoint) else {
        let message = &state.http.error_handling.not_found_message;
        return error_envelope(
            ErrorCode::NotFound,
            format!("{message}: {} {endpoint}", method.as_str()),
        );
    };

    if route.method != method {
        let err = HandlerError::MethodNotAllowed {
            endpoint: endpoint.to_string(),
            expected: route.method.as_str().to_string(),
        };
        return err.to_envelope(&route.default_error_code);
    }

    let result = (route.handler)(data).await;
    match result {
        Ok(value) => normalize_transport_response(endpoint, value, &route.default_error_code),
        Err(err) => {
            if matches!(err, HandlerError::Unexpected(_)) {
                error!(endpoint, error = %err, "Handler failed unexpectedly");
            }
            err.to_envelope(&route.default_error_code)
        }
    }
}

// ── Standard endpoints ──────────────────────────────────────────────────────

fn health_endpoint(state: &ServerState) -> Value {
    let identity = state.api.identity();
    let mut response = serde_json::json!({
        "success": true,
        "service": identity.service_name,
        "version": identity.api_version,
        "url": identity.base_url(),
        "timestamp": unix_timestamp(),
    });
    if let Some(extras) = state.api.health_info() {
        if let Value::Object(map) = &mut response {
            for (key, value) in extras {
                map.insert(key, value);
            }
        }
    }
    response
}

fn metrics_json(state: &ServerState) -> Value {
    match state.api.metrics() {
        Some(metrics) => metrics.json_snapshot(),
        None => error_envelope(
            ErrorCode::OperationFailed("METRICS_UNAVAILABLE".into()),
            "Metrics not available",
        ),
    }
}

fn metrics_prometheus(state: &ServerState) -> Value {
    match state.api.metrics() {
        Some(metrics) => serde_json::json!({
            "success": true,
            "_raw_text": metrics.prometheus_text(),
        }),
        None => error_envelope(
            ErrorCode::OperationFailed("METRICS_UNAVAILABLE".into()),
            "Prometheus metrics not available",
        ),
    }
}

fn openapi_endpoint(state: &ServerState) -> Value {
    match state.api.openapi_document() {
        Some(document) => document,
        None => error_envelope(
            ErrorCode::OperationFailed("OPENAPI_UNAVAILABLE".into()),
            "OpenAPI specification not available",
        ),
    }
}

fn status_endpoint(state: &ServerState) -> Value {
    serde_json::json!({
        "success": true,
        "status": "running",
        "extension": state.api.identity().name,
        "timestamp": unix_timestamp(),
    })
}

// ── Encoding ────────────────────────────────────────────────────────────────

/// Encode the handler value: raw text passes through byte-for-byte; JSON
/// envelopes derive their status from `error_code`; the docs endpoints are
/// 200 only when the payload is an OpenAPI document.
fn finish(state: &ServerState, endpoint: &str, value: Value) -> Response {
    match ResponsePayload::from_value(value) {
        ResponsePayload::Raw { body, content_type } => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type.as_str())
            .body(Body::from(body))
            .unwrap_or_default(),
        ResponsePayload::Json(value) => {
            let status = if matches!(endpoint, "docs" | "openapi.json") {
                if value.get("openapi").is_some() {
                    StatusCode::OK
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            } else {
                envelope_status(&value)
            };
            encode_json(state, value, status)
        }
    }
}

/// HTTP status for an envelope: 200 on success, else the taxonomy mapping
/// for its `error_code`.
fn envelope_status(value: &Value) -> StatusCode {
    let success = value.get("success").and_then(Value::as_bool).unwrap_or(true);
    if success {
        return StatusCode::OK;
    }
    let code = value
        .get("error_code")
        .and_then(Value::as_str)
        .map(ErrorCode::from_str_code)
        .unwrap_or(ErrorCode::OperationFailed("INTERNAL_ERROR".into()));
    StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn encode_json(state: &ServerState, value: Value, status: StatusCode) -> Response {
    let body = match state.http.response_formats.json_indent {
        Some(_) => serde_json::to_string_pretty(&value),
        None => serde_json::to_string(&value),
    }
    .unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap_or_default()
}
