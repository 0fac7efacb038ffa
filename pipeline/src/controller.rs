//! The dispatch surface controllers expose to the binding layer.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use gantry_types::{Context, ParamValue};

use crate::error::{ActionError, ResolveFailure};

/// Action invocation future type alias.
pub type ActionFut<'a> = Pin<Box<dyn Future<Output = Result<Value, ResolveFailure>> + Send + 'a>>;

/// Recovery hook future type alias. The hook writes the response itself;
/// its output is not inspected.
pub type RecoverFut<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// One declared action: dispatch name plus its parameter count.
///
/// The explicit parameter count replaces runtime signature inspection: the
/// pipeline resolves exactly `arity` argument slots, so a signature change
/// that is not reflected here is caught by tests rather than silently
/// misbinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: &'static str,
    pub arity: usize,
}

impl ActionSpec {
    #[must_use]
    pub const fn new(name: &'static str, arity: usize) -> Self {
        Self { name, arity }
    }
}

/// A controller: a named set of actions invokable with resolved arguments.
pub trait Controller: Send + Sync {
    /// Stable name used as the metadata key and in diagnostics.
    fn name(&self) -> &'static str;

    /// The declared action table.
    fn actions(&self) -> &'static [ActionSpec];

    /// Run an action body with a fully resolved argument list.
    fn invoke<'a>(
        &'a self,
        action: &'a str,
        ctx: &'a Context,
        args: Vec<ParamValue>,
    ) -> ActionFut<'a>;

    /// Optional recovery hook for resolution failures. `None` means the hook
    /// is absent and the transport applies its default.
    fn recover<'a>(&'a self, _ctx: &'a Context, _error: &'a ActionError) -> Option<RecoverFut<'a>> {
        None
    }

    /// Declared parameter count for `action`, if the action exists.
    fn arity(&self, action: &str) -> Option<usize> {
        self.actions()
            .iter()
            .find(|spec| spec.name == action)
            .map(|spec| spec.arity)
    }
}
