//! Core data types shared across the Gantry crates.
//!
//! Everything here is plain data: the immutable [`Request`] snapshot, the
//! writable [`ResponseHandle`] overlay, the [`ParamValue`] argument currency
//! flowing through parameter resolution, the [`SessionData`] snapshot/overlay
//! pair, and the per-invocation [`Context`] handed to every resolver.

mod context;
mod param;
mod request;
mod session;

pub use context::{Context, SharedSession};
pub use param::ParamValue;
pub use request::{Request, ResponseHandle, ResponseParts};
pub use session::SessionData;

/// Placeholder token substituted for a live request handle in error payloads.
pub const REQUEST_TOKEN: &str = "[request]";

/// Placeholder token substituted for a live response handle in error payloads.
pub const RESPONSE_TOKEN: &str = "[response]";
