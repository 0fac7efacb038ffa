//! Entity lookups: decorations that swap a key for the record it names.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use gantry_types::ParamValue;

use crate::decoration::Decoration;
use crate::error::ResolveFailure;

/// Lookup future type alias. Failures convert into [`ResolveFailure`]; a
/// plain string rejection becomes a failure named `"Unknown"` via the
/// `From<String>` impl.
pub type LookupFut = Pin<Box<dyn Future<Output = Result<Value, ResolveFailure>> + Send>>;

/// A record type that can be fetched by key.
pub trait Entity: Send + Sync + 'static {
    /// Fetch the record identified by `key` (the chain's running value).
    fn find(key: Value) -> LookupFut;
}

/// Decoration that replaces the chain's running value with the entity the
/// value identifies. A failed lookup fails the whole resolution; whether the
/// lookup fails before or after its first suspension point, the surfaced
/// error shape is identical.
#[must_use]
pub fn entity<E: Entity>() -> Decoration {
    Decoration::async_function("entity", |_ctx, prev| async move {
        let found = E::find(prev.into_value()).await?;
        Ok(ParamValue::Value(found))
    })
}

/// Same contract for a standalone lookup function.
#[must_use]
pub fn entity_with<F>(lookup: F) -> Decoration
where
    F: Fn(Value) -> LookupFut + Send + Sync + 'static,
{
    Decoration::async_function("entity", move |_ctx, prev| {
        let pending = lookup(prev.into_value());
        async move {
            let found = pending.await?;
            Ok(ParamValue::Value(found))
        }
    })
}
