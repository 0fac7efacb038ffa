//! Per-request dispatch: context assembly, pipeline call, outcome binding.
//!
//! Undecorated actions receive the raw transport handles positionally: the
//! fallback argument list is always `[request, response]`. The outcome binds
//! to exactly one outbound write: a committed response handle wins over the
//! action's return value, an unhandled resolution failure becomes the
//! transport default (404), and registration-shape errors are server errors.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::body::Body;
use axum::extract::{RawPathParams, Request as AxumRequest};
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use gantry_pipeline::{Escalation, PipelineError, escalate};
use gantry_session as sessions;
use gantry_types::{Context, ParamValue, Request, ResponseParts, SharedSession};

use crate::app::AppState;

const BODY_LIMIT: usize = 2 * 1024 * 1024;

pub(crate) async fn dispatch(
    state: Arc<AppState>,
    controller_name: &'static str,
    action: &'static str,
    raw_params: RawPathParams,
    query: HashMap<String, String>,
    request: AxumRequest,
) -> Response {
    let Some(controller) = state.controllers.get(controller_name) else {
        // Routes are validated at build time, so this only fires if a router
        // is assembled by hand against the wrong state.
        tracing::error!(controller_name, "route targets an unregistered controller");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
    };
    let controller = Arc::clone(controller);

    let path_params: HashMap<String, String> = raw_params
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    let (parts, body) = request.into_parts();
    let headers: Vec<(String, String)> = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let snapshot = Arc::new(
        Request::new(parts.method.as_str(), parts.uri.path())
            .with_headers(headers)
            .with_raw_query(parts.uri.query().unwrap_or_default()),
    );

    let bytes = match axum::body::to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!(%error, "failed to read request body");
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
        }
    };
    let body_value = match parse_body(&snapshot, &bytes) {
        Ok(value) => value,
        Err(response) => return response,
    };

    let (session_id, fresh_session) = sessions::session_id_from(&snapshot, &state.cookie);
    let session_data = match sessions::open(state.sessions.as_ref(), &session_id).await {
        Ok(data) => data,
        Err(error) => {
            tracing::error!(%error, "session load failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "session unavailable");
        }
    };
    let session: SharedSession = Arc::new(Mutex::new(session_data));

    let ctx = Context::new(Arc::clone(&snapshot))
        .with_path_params(path_params)
        .with_query(query)
        .with_body(body_value)
        .with_session(Arc::clone(&session));

    let fallback = vec![
        ParamValue::Request(Arc::clone(ctx.request())),
        ParamValue::Response(ctx.response().clone()),
    ];

    let outcome = state
        .pipeline
        .bind(Arc::clone(&controller), action)
        .call(&ctx, fallback)
        .await;

    let set_cookie =
        fresh_session.then(|| format!("{}={session_id}; Path=/; HttpOnly", state.cookie));

    let response = match outcome {
        Ok(value) => bind_success(&ctx, value, set_cookie.as_deref()),
        Err(PipelineError::Action(error)) => {
            match escalate(controller.as_ref(), &ctx, error).await {
                Escalation::Recovered => {
                    finalize(ctx.response().snapshot(), StatusCode::OK, set_cookie.as_deref())
                }
                Escalation::Unhandled(error) => {
                    tracing::warn!(
                        controller = controller_name,
                        action,
                        "unhandled resolution failure: {}",
                        error.message
                    );
                    error_response(StatusCode::NOT_FOUND, &error.message)
                }
            }
        }
        Err(error) => {
            tracing::error!(controller = controller_name, action, %error, "dispatch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string())
        }
    };

    persist_session(&state, &session).await;
    response
}

fn parse_body(request: &Request, bytes: &[u8]) -> Result<Value, Response> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    let is_json = request
        .header("content-type")
        .is_some_and(|content_type| content_type.contains("application/json"));
    if is_json {
        serde_json::from_slice(bytes).map_err(|error| {
            error_response(
                StatusCode::BAD_REQUEST,
                &format!("invalid JSON body: {error}"),
            )
        })
    } else {
        Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()))
    }
}

/// A committed response handle wins; otherwise the action's value becomes
/// the body (null means no content).
fn bind_success(ctx: &Context, value: Value, set_cookie: Option<&str>) -> Response {
    if ctx.response().is_committed() {
        return finalize(ctx.response().snapshot(), StatusCode::OK, set_cookie);
    }
    if value.is_null() {
        let mut response = StatusCode::NO_CONTENT.into_response();
        append_cookie(&mut response, set_cookie);
        return response;
    }
    let mut response = (StatusCode::OK, Json(value)).into_response();
    append_cookie(&mut response, set_cookie);
    response
}

fn finalize(parts: ResponseParts, default_status: StatusCode, set_cookie: Option<&str>) -> Response {
    let status = parts
        .status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(default_status);
    let mut response = Response::new(Body::from(parts.body.unwrap_or_default()));
    *response.status_mut() = status;
    for (name, value) in parts.headers {
        let Ok(name) = HeaderName::try_from(name.as_str()) else {
            tracing::warn!(header = %name, "dropping invalid response header");
            continue;
        };
        let Ok(value) = HeaderValue::try_from(value.as_str()) else {
            tracing::warn!(header = %name, "dropping invalid response header value");
            continue;
        };
        response.headers_mut().append(name, value);
    }
    append_cookie(&mut response, set_cookie);
    response
}

fn append_cookie(response: &mut Response, set_cookie: Option<&str>) {
    if let Some(cookie) = set_cookie {
        if let Ok(value) = HeaderValue::try_from(cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn persist_session(state: &AppState, session: &SharedSession) {
    let data = match session.lock() {
        Ok(guard) => guard.clone(),
        Err(_) => return,
    };
    if let Err(error) = sessions::persist(state.sessions.as_ref(), data).await {
        tracing::warn!(%error, "session persist failed");
    }
}
