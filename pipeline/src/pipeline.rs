//! The resolution pipeline: compute every parameter, invoke once.

use std::sync::Arc;

use serde_json::Value;

use gantry_container::Container;
use gantry_types::{Context, ParamValue};

use crate::controller::Controller;
use crate::decoration::{Decoration, ParamResolver, Payload};
use crate::error::{ActionError, ActionRef, PipelineError, ResolveFailure};
use crate::metadata::{MetadataStore, ParameterChain};

/// Binds controllers to their decoration tables and the service container.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<MetadataStore>,
    services: Arc<Container>,
}

impl Pipeline {
    #[must_use]
    pub fn new(store: Arc<MetadataStore>, services: Arc<Container>) -> Self {
        Self { store, services }
    }

    /// Bind `(controller, action)` for invocation.
    #[must_use]
    pub fn bind(&self, controller: Arc<dyn Controller>, action: impl Into<String>) -> BoundAction {
        BoundAction {
            controller,
            action: action.into(),
            store: Arc::clone(&self.store),
            services: Arc::clone(&self.services),
        }
    }
}

/// One `(controller, action)` pair ready to be called.
pub struct BoundAction {
    controller: Arc<dyn Controller>,
    action: String,
    store: Arc<MetadataStore>,
    services: Arc<Container>,
}

impl BoundAction {
    /// Resolve every parameter and invoke the action once.
    ///
    /// `fallback` is the explicit calling contract for undecorated slots: an
    /// ordered list consumed left to right, skipping decorated slots, with
    /// the null sentinel once exhausted. An action with no decorations at
    /// all receives the list unchanged, exactly as if it were called
    /// directly.
    pub async fn call(
        &self,
        ctx: &Context,
        fallback: Vec<ParamValue>,
    ) -> Result<Value, PipelineError> {
        let controller_name = self.controller.name();
        let decorated = self
            .store
            .method(controller_name, &self.action)
            .filter(|metadata| metadata.has_decorations());

        let Some(metadata) = decorated else {
            return match self.controller.invoke(&self.action, ctx, fallback.clone()).await {
                Ok(value) => Ok(value),
                Err(failure) => Err(self.fail(&fallback, failure).into()),
            };
        };

        // Registration-shape errors surface before any resolver runs.
        for (_, chain) in metadata.chains() {
            if chain.iter().any(|decoration| !decoration.is_valid()) {
                return Err(PipelineError::InvalidDecoration {
                    class: controller_name.to_string(),
                    method: self.action.clone(),
                });
            }
        }

        let arity =
            self.controller
                .arity(&self.action)
                .ok_or_else(|| PipelineError::UnknownAction {
                    controller: controller_name.to_string(),
                    action: self.action.clone(),
                })?;

        let mut args: Vec<ParamValue> = Vec::with_capacity(arity);
        let mut cursor = fallback.into_iter();
        for index in 0..arity {
            match metadata.chain(index) {
                Some(chain) if !chain.is_empty() => {
                    match self.resolve_chain(ctx, chain).await {
                        Ok(value) => args.push(value),
                        Err(failure) => return Err(self.fail(&args, failure).into()),
                    }
                }
                _ => args.push(cursor.next().unwrap_or_else(ParamValue::none)),
            }
        }

        match self.controller.invoke(&self.action, ctx, args.clone()).await {
            Ok(value) => Ok(value),
            Err(failure) => Err(self.fail(&args, failure).into()),
        }
    }

    /// Fold one chain sequentially, innermost to outermost, starting from
    /// the null sentinel. The chain never observes sibling slots.
    async fn resolve_chain(
        &self,
        ctx: &Context,
        chain: &ParameterChain,
    ) -> Result<ParamValue, ResolveFailure> {
        let mut value = ParamValue::none();
        for decoration in chain {
            let resolver = self.resolver_for(decoration)?;
            value = resolver.resolve_param(ctx, value).await?;
        }
        Ok(value)
    }

    /// Collapse a decoration's payload into a callable resolver. Service
    /// payloads go through the container here, at evaluation time.
    fn resolver_for(
        &self,
        decoration: &Decoration,
    ) -> Result<Arc<dyn ParamResolver>, ResolveFailure> {
        match decoration.payload() {
            Some(
                Payload::Function(resolver)
                | Payload::Instance(resolver)
                | Payload::Factory(resolver),
            ) => Ok(Arc::clone(resolver)),
            Some(Payload::Service(binding)) => {
                binding.instantiate(&self.services).map_err(|error| {
                    tracing::warn!(
                        service = binding.type_name,
                        tag = decoration.tag(),
                        "service payload failed to resolve"
                    );
                    ResolveFailure::from(error)
                })
            }
            // Payloads were validated before resolution started.
            None => Err(ResolveFailure::new(format!(
                "decoration \"{}\" has no payload",
                decoration.tag()
            ))),
        }
    }

    fn fail(&self, args: &[ParamValue], failure: ResolveFailure) -> ActionError {
        let meta = ActionRef {
            controller: self.controller.name().to_string(),
            action: self.action.clone(),
        };
        tracing::debug!(
            controller = %meta.controller,
            action = %meta.action,
            "resolution failed: {}",
            failure.message
        );
        ActionError::new(meta, args.iter().map(ParamValue::redacted).collect(), failure)
    }
}

/// Outcome of offering a failure to the controller's recovery hook.
#[derive(Debug)]
pub enum Escalation {
    /// The hook ran; it is expected to have written the response.
    Recovered,
    /// No hook; the caller applies the transport default.
    Unhandled(ActionError),
}

/// Offer `error` to the controller's recovery hook, if it exposes one.
pub async fn escalate(
    controller: &dyn Controller,
    ctx: &Context,
    error: ActionError,
) -> Escalation {
    let recovered = if let Some(hook) = controller.recover(ctx, &error) {
        hook.await;
        true
    } else {
        false
    };
    if recovered {
        Escalation::Recovered
    } else {
        Escalation::Unhandled(error)
    }
}
