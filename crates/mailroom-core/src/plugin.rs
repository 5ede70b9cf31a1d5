//! Plugin system: shared service registry, route and OpenAPI assembly
//!
//! Each subsystem crate ships a plugin that registers its services into
//! the shared registry and contributes its routes and API document. The
//! binary assembles them in dependency order and builds one router.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::Router;
use thiserror::Error;
use tracing::debug;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::{
    ComponentsBuilder, InfoBuilder, OpenApi, OpenApiBuilder, ServerBuilder,
};

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("plugin '{plugin}' failed to start: {message}")]
    Startup {
        plugin: &'static str,
        message: String,
    },
}

/// A subsystem wired into the application at startup.
///
/// `register` runs once, in registration order, and may pull services
/// earlier plugins provided out of the registry.
#[async_trait]
pub trait MailroomPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    async fn register(&self, services: &ServiceRegistry) -> Result<(), PluginError>;

    fn routes(&self, _services: &ServiceRegistry) -> Option<Router> {
        None
    }

    fn api_doc(&self) -> Option<OpenApi> {
        None
    }
}

/// Type-keyed store of shared services.
///
/// Holds one `Arc<T>` per type; registering the same type again
/// replaces the earlier entry. Unsized targets work too, so trait
/// objects register as `insert::<dyn Clock>(...)`.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: ?Sized + Send + Sync + 'static>(&self, service: Arc<T>) {
        debug!("Registering service {}", std::any::type_name::<T>());
        self.entries
            .write()
            .unwrap()
            .insert(TypeId::of::<T>(), Box::new(service));
    }

    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .read()
            .unwrap()
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Panics when the service is missing: a wiring bug, not a runtime
    /// condition. The message names the type so the registration-order
    /// mistake is obvious.
    pub fn expect<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        self.get::<T>().unwrap_or_else(|| {
            panic!(
                "service {} was never registered; a plugin that provides it must run first",
                std::any::type_name::<T>()
            )
        })
    }
}

/// Assembles registered plugins into one application.
pub struct PluginManager {
    plugins: Vec<Box<dyn MailroomPlugin>>,
    services: Arc<ServiceRegistry>,
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            services: Arc::new(ServiceRegistry::new()),
        }
    }

    /// The shared registry, for seeding core services before startup.
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// Registration order is initialization order; dependencies first.
    pub fn add_plugin(&mut self, plugin: Box<dyn MailroomPlugin>) {
        self.plugins.push(plugin);
    }

    pub async fn initialize(&self) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            debug!("Starting plugin '{}'", plugin.name());
            plugin.register(&self.services).await?;
        }
        Ok(())
    }

    /// Merge every plugin's routes under the `/api` prefix.
    pub fn router(&self) -> Router {
        let mut api = Router::new();
        for plugin in &self.plugins {
            if let Some(routes) = plugin.routes(&self.services) {
                api = api.merge(routes);
            }
        }
        Router::new().nest("/api", api)
    }

    /// One OpenAPI document covering every plugin's surface.
    pub fn openapi(&self) -> OpenApi {
        let mut document = OpenApiBuilder::new()
            .info(
                InfoBuilder::new()
                    .title("Mailroom")
                    .description(Some(
                        "Contact intake and transactional email delivery API",
                    ))
                    .version(env!("CARGO_PKG_VERSION"))
                    .build(),
            )
            .servers(Some(vec![ServerBuilder::new().url("/api").build()]))
            .components(Some(
                ComponentsBuilder::new()
                    .security_scheme("bearer_auth", bearer_scheme())
                    .build(),
            ))
            .build();

        for plugin in &self.plugins {
            if let Some(doc) = plugin.api_doc() {
                merge_api_doc(&mut document, doc);
            }
        }

        document
    }
}

/// Fold one plugin's document into the combined one: paths, component
/// schemas/responses, tags.
fn merge_api_doc(base: &mut OpenApi, doc: OpenApi) {
    base.paths.paths.extend(doc.paths.paths);

    if let Some(components) = doc.components {
        let target = base
            .components
            .get_or_insert_with(|| ComponentsBuilder::new().build());
        target.schemas.extend(components.schemas);
        target.responses.extend(components.responses);
    }

    if let Some(tags) = doc.tags {
        base.tags.get_or_insert_with(Vec::new).extend(tags);
    }
}

fn bearer_scheme() -> SecurityScheme {
    SecurityScheme::Http(
        HttpBuilder::new()
            .scheme(HttpAuthScheme::Bearer)
            .description(Some(
                "Admin bearer token, sent as `Authorization: Bearer <token>`",
            ))
            .build(),
    )
}
