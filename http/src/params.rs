//! Standard parameter decorations.
//!
//! Each of these is a thin wrapper over the core decoration primitive,
//! reading one well-known slice of the context. Missing values resolve to
//! JSON null rather than failing; lookups that must fail on absence belong
//! in an entity decoration.

use std::sync::Arc;

use serde_json::Value;

use gantry_pipeline::Decoration;
use gantry_types::ParamValue;

/// A path segment captured by the route, e.g. `id` in `/widgets/:id`.
#[must_use]
pub fn path(name: &'static str) -> Decoration {
    Decoration::function("path", move |ctx, _prev| {
        Ok(ctx
            .path_param(name)
            .map_or_else(ParamValue::none, ParamValue::from))
    })
}

/// A query-string parameter.
#[must_use]
pub fn query(name: &'static str) -> Decoration {
    Decoration::function("query", move |ctx, _prev| {
        Ok(ctx
            .query_param(name)
            .map_or_else(ParamValue::none, ParamValue::from))
    })
}

/// The parsed request body.
#[must_use]
pub fn body() -> Decoration {
    Decoration::function("body", |ctx, _prev| {
        Ok(ParamValue::Value(ctx.body().clone()))
    })
}

/// A request header, matched case-insensitively.
#[must_use]
pub fn header(name: &'static str) -> Decoration {
    Decoration::function("header", move |ctx, _prev| {
        Ok(ctx
            .request()
            .header(name)
            .map_or_else(ParamValue::none, ParamValue::from))
    })
}

/// One entry from the session overlay.
#[must_use]
pub fn session(key: &'static str) -> Decoration {
    Decoration::function("session", move |ctx, _prev| {
        Ok(ctx
            .session_value(key)
            .map_or_else(ParamValue::none, ParamValue::Value))
    })
}

/// The live request handle. Redacted to `"[request]"` in error payloads.
#[must_use]
pub fn request() -> Decoration {
    Decoration::function("request", |ctx, _prev| {
        Ok(ParamValue::Request(Arc::clone(ctx.request())))
    })
}

/// The live response handle. Redacted to `"[response]"` in error payloads.
#[must_use]
pub fn response() -> Decoration {
    Decoration::function("response", |ctx, _prev| {
        Ok(ParamValue::Response(ctx.response().clone()))
    })
}

/// The whole session overlay as a JSON object, for actions that inspect
/// more than one entry.
#[must_use]
pub fn session_entries() -> Decoration {
    Decoration::function("session", |ctx, _prev| {
        let entries = ctx
            .session()
            .lock()
            .map(|session| Value::Object(session.entries().clone()))
            .unwrap_or(Value::Null);
        Ok(ParamValue::Value(entries))
    })
}
