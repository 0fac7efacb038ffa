//! Application assembly: controllers, routes, services, and the socket.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, RawPathParams, Request};
use axum::http::Method;
use axum::routing::{MethodFilter, on};
use thiserror::Error;
use tower_http::trace::TraceLayer;

use gantry_config::GantryConfig;
use gantry_container::{Container, ContainerError};
use gantry_pipeline::{Controller, Decoration, MetadataStore, Pipeline};
use gantry_session::{DEFAULT_COOKIE, MemoryStore, SessionStore};

use crate::dispatch;

const DEFAULT_SESSION_TTL_SECS: i64 = 1800;

/// One entry of the route table: verb and path mapped to an action.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub controller: &'static str,
    pub action: &'static str,
}

/// Errors detected while assembling an application.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("duplicate controller \"{name}\"")]
    DuplicateController { name: &'static str },
    #[error(transparent)]
    Service(#[from] ContainerError),
    #[error("route {method} {path} targets unknown controller \"{controller}\"")]
    UnknownController {
        method: Method,
        path: String,
        controller: &'static str,
    },
    #[error("route {method} {path} targets undeclared action \"{controller}.{action}\"")]
    UnknownAction {
        method: Method,
        path: String,
        controller: &'static str,
        action: &'static str,
    },
    #[error("method {method} is not routable")]
    UnsupportedMethod { method: Method },
}

/// Errors raised while serving.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("server stopped: {source}")]
    Serve { source: std::io::Error },
}

pub(crate) struct AppState {
    pub(crate) pipeline: Pipeline,
    pub(crate) controllers: HashMap<&'static str, Arc<dyn Controller>>,
    pub(crate) sessions: Arc<dyn SessionStore>,
    pub(crate) cookie: String,
}

/// A fully assembled application: frozen decoration tables, a route table,
/// and everything dispatch needs.
pub struct Application {
    state: Arc<AppState>,
    routes: Vec<Route>,
}

impl Application {
    #[must_use]
    pub fn builder() -> AppBuilder {
        AppBuilder {
            container: Container::new(),
            store: MetadataStore::new(),
            controllers: HashMap::new(),
            routes: Vec::new(),
            sessions: None,
            cookie: DEFAULT_COOKIE.to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            error: None,
        }
    }

    /// The axum router serving this application's route table.
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new();
        for route in &self.routes {
            // Methods were validated at build time.
            let Ok(filter) = MethodFilter::try_from(route.method.clone()) else {
                continue;
            };
            let state = Arc::clone(&self.state);
            let controller = route.controller;
            let action = route.action;
            router = router.route(
                &route.path,
                on(
                    filter,
                    move |params: RawPathParams,
                          Query(query): Query<HashMap<String, String>>,
                          request: Request| {
                        dispatch::dispatch(
                            Arc::clone(&state),
                            controller,
                            action,
                            params,
                            query,
                            request,
                        )
                    },
                ),
            );
        }
        router.layer(TraceLayer::new_for_http())
    }

    /// Bind `addr` and serve until the task is stopped.
    pub async fn serve(self, addr: &str) -> Result<(), ServeError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServeError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, routes = self.routes.len(), "listening");
        axum::serve(listener, self.router())
            .await
            .map_err(|source| ServeError::Serve { source })
    }
}

/// Chainable application assembly. Registration never fails mid-chain; the
/// first error is reported by [`AppBuilder::build`].
pub struct AppBuilder {
    container: Container,
    store: MetadataStore,
    controllers: HashMap<&'static str, Arc<dyn Controller>>,
    routes: Vec<Route>,
    sessions: Option<Arc<dyn SessionStore>>,
    cookie: String,
    session_ttl_secs: i64,
    error: Option<BuildError>,
}

impl AppBuilder {
    /// Apply `[session]` settings from the loaded configuration.
    #[must_use]
    pub fn with_config(mut self, config: &GantryConfig) -> Self {
        self.cookie = config.session_cookie();
        self.session_ttl_secs = config.session_ttl_secs();
        self
    }

    /// Register a shared service for *service* decoration payloads.
    #[must_use]
    pub fn service<T>(mut self, service: Arc<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        if self.error.is_none() {
            if let Err(error) = self.container.register(service) {
                self.error = Some(BuildError::Service(error));
            }
        }
        self
    }

    /// Replace the default in-memory session store.
    #[must_use]
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(store);
        self
    }

    #[must_use]
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie = name.into();
        self
    }

    /// Register a controller, declaring its routes and parameter decorations
    /// inside `setup`.
    #[must_use]
    pub fn controller<C>(mut self, controller: C, setup: impl FnOnce(&mut ControllerScope<'_>)) -> Self
    where
        C: Controller + 'static,
    {
        let name = controller.name();
        if self.controllers.contains_key(name) {
            if self.error.is_none() {
                self.error = Some(BuildError::DuplicateController { name });
            }
            return self;
        }
        self.controllers.insert(name, Arc::new(controller));
        let mut scope = ControllerScope {
            controller: name,
            store: &mut self.store,
            routes: &mut self.routes,
        };
        setup(&mut scope);
        self
    }

    /// Validate the route table and freeze the decoration store.
    pub fn build(self) -> Result<Application, BuildError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        for route in &self.routes {
            let Some(controller) = self.controllers.get(route.controller) else {
                return Err(BuildError::UnknownController {
                    method: route.method.clone(),
                    path: route.path.clone(),
                    controller: route.controller,
                });
            };
            if controller.arity(route.action).is_none() {
                return Err(BuildError::UnknownAction {
                    method: route.method.clone(),
                    path: route.path.clone(),
                    controller: route.controller,
                    action: route.action,
                });
            }
            if MethodFilter::try_from(route.method.clone()).is_err() {
                return Err(BuildError::UnsupportedMethod {
                    method: route.method.clone(),
                });
            }
        }

        let sessions = self
            .sessions
            .unwrap_or_else(|| Arc::new(MemoryStore::new(self.session_ttl_secs)));
        let pipeline = Pipeline::new(Arc::new(self.store), Arc::new(self.container));
        Ok(Application {
            state: Arc::new(AppState {
                pipeline,
                controllers: self.controllers,
                sessions,
                cookie: self.cookie,
            }),
            routes: self.routes,
        })
    }
}

/// Registration surface handed to a controller's setup closure.
pub struct ControllerScope<'a> {
    controller: &'static str,
    store: &'a mut MetadataStore,
    routes: &'a mut Vec<Route>,
}

impl ControllerScope<'_> {
    pub fn route(&mut self, method: Method, path: &str, action: &'static str) -> &mut Self {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            controller: self.controller,
            action,
        });
        self
    }

    pub fn get(&mut self, path: &str, action: &'static str) -> &mut Self {
        self.route(Method::GET, path, action)
    }

    pub fn post(&mut self, path: &str, action: &'static str) -> &mut Self {
        self.route(Method::POST, path, action)
    }

    pub fn put(&mut self, path: &str, action: &'static str) -> &mut Self {
        self.route(Method::PUT, path, action)
    }

    pub fn delete(&mut self, path: &str, action: &'static str) -> &mut Self {
        self.route(Method::DELETE, path, action)
    }

    /// Attach a decoration to parameter `index` of `action`. Attaching
    /// prepends: the most recently attached decoration evaluates first.
    pub fn decorate(&mut self, action: &'static str, index: usize, decoration: Decoration) -> &mut Self {
        self.store.decorate(self.controller, action, index, decoration);
        self
    }
}
