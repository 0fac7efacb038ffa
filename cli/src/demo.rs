//! Demo application: a tiny widget catalog exercising the pipeline.
//!
//! Shows the pieces working together: path and body decorations, an entity
//! lookup over a seeded catalog, a session-backed visit counter, and a
//! controller recovery hook turning lookup failures into a JSON 404.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Value, json};

use gantry_config::GantryConfig;
use gantry_http::{Application, BuildError, params};
use gantry_pipeline::{
    ActionError, ActionFut, ActionSpec, Controller, RecoverFut, ResolveFailure, entity_with,
};
use gantry_types::{Context, ParamValue};

fn widget_catalog() -> HashMap<String, Value> {
    HashMap::from([
        (
            "1".to_string(),
            json!({ "id": "1", "name": "bolt", "stock": 12 }),
        ),
        (
            "2".to_string(),
            json!({ "id": "2", "name": "gear", "stock": 3 }),
        ),
    ])
}

struct StatusController;

impl Controller for StatusController {
    fn name(&self) -> &'static str {
        "StatusController"
    }

    fn actions(&self) -> &'static [ActionSpec] {
        const ACTIONS: &[ActionSpec] = &[ActionSpec::new("status", 0)];
        ACTIONS
    }

    fn invoke<'a>(
        &'a self,
        _action: &'a str,
        _ctx: &'a Context,
        _args: Vec<ParamValue>,
    ) -> ActionFut<'a> {
        Box::pin(async { Ok(json!({ "status": "ok" })) })
    }
}

struct WidgetController;

impl Controller for WidgetController {
    fn name(&self) -> &'static str {
        "WidgetController"
    }

    fn actions(&self) -> &'static [ActionSpec] {
        const ACTIONS: &[ActionSpec] = &[
            ActionSpec::new("show", 1),
            ActionSpec::new("create", 1),
            ActionSpec::new("visits", 1),
        ];
        ACTIONS
    }

    fn invoke<'a>(
        &'a self,
        action: &'a str,
        ctx: &'a Context,
        args: Vec<ParamValue>,
    ) -> ActionFut<'a> {
        Box::pin(async move {
            match action {
                "show" => Ok(args.first().map(ParamValue::redacted).unwrap_or(Value::Null)),
                "create" => {
                    let widget = args.first().map(ParamValue::redacted).unwrap_or(Value::Null);
                    if !widget.is_object() {
                        return Err(ResolveFailure::new("widget payload must be an object"));
                    }
                    Ok(json!({ "created": widget }))
                }
                "visits" => {
                    let next = args.first().and_then(ParamValue::as_i64).unwrap_or(0) + 1;
                    if let Ok(mut session) = ctx.session().lock() {
                        session.insert("visits", json!(next));
                    }
                    Ok(json!({ "visits": next }))
                }
                other => Err(ResolveFailure::new(format!("unknown action {other}"))),
            }
        })
    }

    fn recover<'a>(&'a self, ctx: &'a Context, error: &'a ActionError) -> Option<RecoverFut<'a>> {
        Some(Box::pin(async move {
            ctx.response().set_status(404);
            ctx.response().write_json(&json!({ "error": error.message }));
        }))
    }
}

pub(crate) fn application(config: &GantryConfig) -> Result<Application, BuildError> {
    let catalog = Arc::new(widget_catalog());

    Application::builder()
        .with_config(config)
        .controller(StatusController, |scope| {
            scope.get("/status", "status");
        })
        .controller(WidgetController, |scope| {
            scope
                .get("/widgets/:id", "show")
                .post("/widgets", "create")
                .get("/visits", "visits");

            scope.decorate(
                "show",
                0,
                entity_with(move |key| {
                    let catalog = Arc::clone(&catalog);
                    Box::pin(async move {
                        let id = key.as_str().unwrap_or_default().to_string();
                        catalog.get(&id).cloned().ok_or_else(|| {
                            ResolveFailure::named("NotFound", format!("no widget with id {id}"))
                        })
                    })
                }),
            );
            scope.decorate("show", 0, params::path("id"));

            scope.decorate("create", 0, params::body());
            scope.decorate("visits", 0, params::session("visits"));
        })
        .build()
}
