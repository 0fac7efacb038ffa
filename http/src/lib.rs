//! HTTP transport binding for the Gantry pipeline.
//!
//! This crate is the glue around the core: it maps verbs and paths to
//! controller actions, builds the per-invocation [`Context`](gantry_types::Context)
//! from the inbound request, invokes the resolution pipeline, and serializes
//! the outcome to exactly one outbound response. It also owns the standard
//! parameter decorations (`path`, `query`, `body`, `header`, `session`,
//! `request`, `response`), all thin wrappers over the core's single
//! decoration primitive, and the [`Application`] builder that wires
//! controllers, services, sessions, and the listening socket together.

mod app;
mod dispatch;
pub mod params;

pub use app::{AppBuilder, Application, BuildError, ControllerScope, Route, ServeError};

#[cfg(test)]
mod tests;
