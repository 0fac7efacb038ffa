//! Decorations: resolution strategies attached to parameter slots.
//!
//! A decoration carries a short `tag` for diagnostics and exactly one of
//! four payloads, all of which collapse to the [`ParamResolver`] capability
//! at evaluation time:
//!
//! - **function**: a plain resolver callable;
//! - **service**: a type resolved lazily through the dependency container;
//! - **instance**: a pre-built resolver shared across every attachment site;
//! - **factory**: a closure run once per attachment, producing a resolver
//!   that may close over per-site mutable state.
//!
//! A decoration built without a payload is invalid; the pipeline rejects it
//! at the first invocation that touches it, never at registration.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use gantry_container::{Container, ContainerError};
use gantry_types::{Context, ParamValue};

use crate::error::ResolveFailure;

/// Resolver future type alias.
pub type ResolveFut<'a> =
    Pin<Box<dyn Future<Output = Result<ParamValue, ResolveFailure>> + Send + 'a>>;

/// One step of a parameter chain: compute a value from the context and the
/// chain's running value.
pub trait ParamResolver: Send + Sync {
    fn resolve_param<'a>(&'a self, ctx: &'a Context, prev: ParamValue) -> ResolveFut<'a>;
}

struct SyncResolver<F>(F);

impl<F> ParamResolver for SyncResolver<F>
where
    F: Fn(&Context, ParamValue) -> Result<ParamValue, ResolveFailure> + Send + Sync,
{
    fn resolve_param<'a>(&'a self, ctx: &'a Context, prev: ParamValue) -> ResolveFut<'a> {
        Box::pin(std::future::ready((self.0)(ctx, prev)))
    }
}

struct AsyncResolver<F, Fut> {
    f: F,
    _marker: std::marker::PhantomData<fn() -> Fut>,
}

impl<F, Fut> ParamResolver for AsyncResolver<F, Fut>
where
    F: Fn(&Context, ParamValue) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ParamValue, ResolveFailure>> + Send + 'static,
{
    fn resolve_param<'a>(&'a self, ctx: &'a Context, prev: ParamValue) -> ResolveFut<'a> {
        Box::pin((self.f)(ctx, prev))
    }
}

/// Wrap a plain closure as a resolver, for instance and factory payloads.
pub fn resolver_fn<F>(f: F) -> impl ParamResolver
where
    F: Fn(&Context, ParamValue) -> Result<ParamValue, ResolveFailure> + Send + Sync,
{
    SyncResolver(f)
}

/// Discriminator for the four payload kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationKind {
    Function,
    Service,
    Instance,
    Factory,
}

/// Lazy binding of a service type to its resolver capability.
pub(crate) struct ServiceBinding {
    pub(crate) type_name: &'static str,
    bind: Box<dyn Fn(&Container) -> Result<Arc<dyn ParamResolver>, ContainerError> + Send + Sync>,
}

impl ServiceBinding {
    pub(crate) fn instantiate(
        &self,
        container: &Container,
    ) -> Result<Arc<dyn ParamResolver>, ContainerError> {
        (self.bind)(container)
    }
}

pub(crate) enum Payload {
    Function(Arc<dyn ParamResolver>),
    Service(ServiceBinding),
    Instance(Arc<dyn ParamResolver>),
    Factory(Arc<dyn ParamResolver>),
}

impl Payload {
    fn kind(&self) -> DecorationKind {
        match self {
            Payload::Function(_) => DecorationKind::Function,
            Payload::Service(_) => DecorationKind::Service,
            Payload::Instance(_) => DecorationKind::Instance,
            Payload::Factory(_) => DecorationKind::Factory,
        }
    }
}

/// A resolution strategy attached to one parameter slot.
pub struct Decoration {
    tag: &'static str,
    payload: Option<Payload>,
}

impl Decoration {
    /// An empty decoration with no payload. Useful as the starting point for
    /// custom decorators; left as-is it fails at first invocation.
    #[must_use]
    pub fn new(tag: &'static str) -> Self {
        Self { tag, payload: None }
    }

    /// Plain resolver closure.
    #[must_use]
    pub fn function<F>(tag: &'static str, f: F) -> Self
    where
        F: Fn(&Context, ParamValue) -> Result<ParamValue, ResolveFailure> + Send + Sync + 'static,
    {
        Self {
            tag,
            payload: Some(Payload::Function(Arc::new(SyncResolver(f)))),
        }
    }

    /// Resolver closure returning a future, for lookups that suspend. The
    /// future owns its captures; anything needed from the context is read
    /// before the future is built.
    #[must_use]
    pub fn async_function<F, Fut>(tag: &'static str, f: F) -> Self
    where
        F: Fn(&Context, ParamValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ParamValue, ResolveFailure>> + Send + 'static,
    {
        Self {
            tag,
            payload: Some(Payload::Function(Arc::new(AsyncResolver {
                f,
                _marker: std::marker::PhantomData,
            }))),
        }
    }

    /// Service type resolved lazily through the dependency container at
    /// chain-evaluation time. The container's singleton policy makes every
    /// site share one instance.
    #[must_use]
    pub fn service<S>(tag: &'static str) -> Self
    where
        S: ParamResolver + Send + Sync + 'static,
    {
        Self {
            tag,
            payload: Some(Payload::Service(ServiceBinding {
                type_name: std::any::type_name::<S>(),
                bind: Box::new(|container| {
                    let service: Arc<dyn ParamResolver> = container.resolve::<S>()?;
                    Ok(service)
                }),
            })),
        }
    }

    /// Pre-built resolver shared across every site it is attached to.
    #[must_use]
    pub fn instance(tag: &'static str, resolver: Arc<dyn ParamResolver>) -> Self {
        Self {
            tag,
            payload: Some(Payload::Instance(resolver)),
        }
    }

    /// Factory invoked once, here, at the point of attachment. The produced
    /// resolver may close over mutable state private to this site.
    #[must_use]
    pub fn factory<R, F>(tag: &'static str, make: F) -> Self
    where
        R: ParamResolver + Send + Sync + 'static,
        F: FnOnce() -> R,
    {
        Self {
            tag,
            payload: Some(Payload::Factory(Arc::new(make()))),
        }
    }

    #[must_use]
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// `None` for a payload-less (invalid) decoration.
    #[must_use]
    pub fn kind(&self) -> Option<DecorationKind> {
        self.payload.as_ref().map(Payload::kind)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.payload.is_some()
    }

    pub(crate) fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }
}

impl std::fmt::Debug for Decoration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoration")
            .field("tag", &self.tag)
            .field("kind", &self.kind())
            .finish()
    }
}
