//! Transport-level tests driving the built router end to end.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request as HttpRequest, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use gantry_pipeline::{
    ActionError, ActionFut, ActionSpec, Controller, Decoration, RecoverFut, ResolveFailure,
    entity_with,
};
use gantry_types::{Context, ParamValue};

use super::Application;
use crate::params;

struct ItemController;

impl Controller for ItemController {
    fn name(&self) -> &'static str {
        "ItemController"
    }

    fn actions(&self) -> &'static [ActionSpec] {
        const ACTIONS: &[ActionSpec] = &[
            ActionSpec::new("show", 1),
            ActionSpec::new("create", 1),
            ActionSpec::new("raw", 2),
            ActionSpec::new("ping", 0),
            ActionSpec::new("tally", 1),
            ActionSpec::new("missing", 1),
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
                "show" => Ok(args[0].redacted()),
                "create" => Ok(json!({ "created": args[0].redacted() })),
                "raw" => {
                    // Undecorated action: the fallbacks are the live handles.
                    let ParamValue::Request(request) = &args[0] else {
                        return Err(ResolveFailure::new("expected the request handle"));
                    };
                    let ParamValue::Response(response) = &args[1] else {
                        return Err(ResolveFailure::new("expected the response handle"));
                    };
                    response.set_status(202);
                    response.write_text(format!("{} {}", request.method(), request.path()));
                    Ok(Value::Null)
                }
                "ping" => Ok(Value::Null),
                "tally" => {
                    let next = args[0].as_i64().unwrap_or(0) + 1;
                    if let Ok(mut session) = ctx.session().lock() {
                        session.insert("count", json!(next));
                    }
                    Ok(json!({ "count": next }))
                }
                "missing" => Ok(args[0].redacted()),
                other => Err(ResolveFailure::new(format!("unknown action {other}"))),
            }
        })
    }
}

struct GuardController;

impl Controller for GuardController {
    fn name(&self) -> &'static str {
        "GuardController"
    }

    fn actions(&self) -> &'static [ActionSpec] {
        const ACTIONS: &[ActionSpec] = &[ActionSpec::new("open", 1)];
        ACTIONS
    }

    fn invoke<'a>(
        &'a self,
        _action: &'a str,
        _ctx: &'a Context,
        _args: Vec<ParamValue>,
    ) -> ActionFut<'a> {
        Box::pin(async { Ok(Value::Null) })
    }

    fn recover<'a>(&'a self, ctx: &'a Context, _error: &'a ActionError) -> Option<RecoverFut<'a>> {
        Some(Box::pin(async move {
            ctx.response().set_status(418);
            ctx.response().write_text("short and stout");
        }))
    }
}

fn app() -> Application {
    Application::builder()
        .controller(ItemController, |scope| {
            scope
                .get("/items/:id", "show")
                .post("/items", "create")
                .get("/raw", "raw")
                .get("/ping", "ping")
                .get("/tally", "tally")
                .get("/missing/:id", "missing");
            scope.decorate("show", 0, params::path("id"));
            scope.decorate("create", 0, params::body());
            scope.decorate("tally", 0, params::session("count"));
            scope.decorate(
                "missing",
                0,
                entity_with(|_key| {
                    Box::pin(async { Err(ResolveFailure::from("Invalid ID")) })
                }),
            );
        })
        .controller(GuardController, |scope| {
            scope.get("/guarded", "open");
            scope.decorate(
                "open",
                0,
                Decoration::function("broken", |_ctx, _prev| Err(ResolveFailure::new("denied"))),
            );
        })
        .build()
        .expect("test application builds")
}

async fn send(
    app: &Application,
    request: HttpRequest<Body>,
) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app
        .router()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body collects");
    (status, headers, bytes.to_vec())
}

fn get(uri: &str) -> HttpRequest<Body> {
    HttpRequest::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

fn json_of(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("json body")
}

#[tokio::test]
async fn path_decorations_bind_route_segments() {
    let (status, _, body) = send(&app(), get("/items/7")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!("7"));
}

#[tokio::test]
async fn body_decorations_feed_the_action() {
    let request = HttpRequest::builder()
        .method("POST")
        .uri("/items")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name":"bolt"}"#))
        .expect("request builds");

    let (status, _, body) = send(&app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!({ "created": { "name": "bolt" } }));
}

#[tokio::test]
async fn malformed_json_bodies_are_rejected() {
    let request = HttpRequest::builder()
        .method("POST")
        .uri("/items")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request builds");

    let (status, _, _) = send(&app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn undecorated_actions_get_the_transport_handles() {
    let (status, _, body) = send(&app(), get("/raw")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, b"GET /raw");
}

#[tokio::test]
async fn null_results_are_no_content() {
    let (status, _, body) = send(&app(), get("/ping")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[tokio::test]
async fn unhandled_failures_become_not_found() {
    let (status, _, body) = send(&app(), get("/missing/9")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_of(&body), json!({ "error": "Invalid ID" }));
}

#[tokio::test]
async fn recovery_hooks_write_the_response() {
    let (status, _, body) = send(&app(), get("/guarded")).await;
    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(body, b"short and stout");
}

#[tokio::test]
async fn sessions_persist_across_requests() {
    let app = app();

    let (status, headers, body) = send(&app, get("/tally")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!({ "count": 1 }));

    let set_cookie = headers
        .get(header::SET_COOKIE)
        .expect("fresh session sets a cookie")
        .to_str()
        .expect("cookie is ascii")
        .to_string();
    let cookie = set_cookie.split(';').next().expect("cookie pair");

    let request = HttpRequest::builder()
        .uri("/tally")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("request builds");
    let (status, headers, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!({ "count": 2 }));
    assert!(headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn unknown_routes_fall_through_to_the_router() {
    let (status, _, _) = send(&app(), get("/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn misdeclared_routes_fail_at_build_time() {
    let result = Application::builder()
        .controller(ItemController, |scope| {
            scope.get("/typo", "shwo");
        })
        .build();
    assert!(matches!(result, Err(super::BuildError::UnknownAction { .. })));
}

#[tokio::test]
async fn duplicate_controllers_fail_at_build_time() {
    let result = Application::builder()
        .controller(ItemController, |_scope| {})
        .controller(ItemController, |_scope| {})
        .build();
    assert!(matches!(
        result,
        Err(super::BuildError::DuplicateController { .. })
    ));
}

#[tokio::test]
async fn services_are_available_to_decorations() {
    use gantry_pipeline::{ParamResolver, ResolveFut};
    use std::sync::atomic::{AtomicI64, Ordering};

    #[derive(Default)]
    struct VisitCounter {
        hits: AtomicI64,
    }

    impl ParamResolver for VisitCounter {
        fn resolve_param<'a>(&'a self, _ctx: &'a Context, _prev: ParamValue) -> ResolveFut<'a> {
            let next = self.hits.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(std::future::ready(Ok(ParamValue::from(next))))
        }
    }

    let app = Application::builder()
        .service(Arc::new(VisitCounter::default()))
        .controller(ItemController, |scope| {
            scope.get("/items/:id", "show");
            scope.decorate("show", 0, Decoration::service::<VisitCounter>("count"));
        })
        .build()
        .expect("application builds");

    let (_, _, first) = send(&app, get("/items/1")).await;
    let (_, _, second) = send(&app, get("/items/1")).await;
    assert_eq!(json_of(&first), json!(1));
    assert_eq!(json_of(&second), json!(2));
}
