//! Parameter-resolution and action-dispatch pipeline.
//!
//! Controllers declare actions, actions declare parameters, and each
//! parameter slot may carry a chain of [`Decoration`]s that compute its
//! runtime value from the inbound [`Context`](gantry_types::Context) before
//! the action body runs. This crate owns the whole of that machinery:
//!
//! - [`Decoration`]: one resolution strategy (function, container service,
//!   shared instance, or per-site factory) attached to one parameter slot;
//! - [`MetadataStore`]: the table of chains keyed by controller and action,
//!   populated at setup time and frozen before dispatch;
//! - [`Pipeline`] / [`BoundAction`]: sequential, innermost-to-outermost
//!   chain evaluation, fallback filling of undecorated slots, and a single
//!   invocation of the action body;
//! - [`entity`] / [`entity_with`]: lookup decorations that swap a key for
//!   the record it names, with normalized failure shapes;
//! - [`escalate`]: offering a failed call to the controller's recovery
//!   hook, or handing it back for the transport default.
//!
//! Two calls to the same action share no resolved state. The deliberate
//! exceptions are a factory payload's per-site closure state and the shared
//! state of a service or instance payload.

mod controller;
mod decoration;
mod entity;
mod error;
mod metadata;
mod pipeline;

pub use controller::{ActionFut, ActionSpec, Controller, RecoverFut};
pub use decoration::{Decoration, DecorationKind, ParamResolver, ResolveFut, resolver_fn};
pub use entity::{Entity, LookupFut, entity, entity_with};
pub use error::{ActionError, ActionRef, PipelineError, ResolveFailure};
pub use metadata::{MetadataStore, MethodMetadata, ParameterChain};
pub use pipeline::{BoundAction, Escalation, Pipeline, escalate};
