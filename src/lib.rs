//! Book catalog application library
//!
//! Wires the books module into the kernel's module registry and the HTTP server.

pub mod modules;
pub mod utils;

use anyhow::Context;
use axum::Router;
use catalog_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use modules::books::service::{BookService, SharedCatalog};

/// Build a registry holding every application module, all sharing `catalog`.
pub fn app_registry(catalog: SharedCatalog) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, catalog)?;
    Ok(registry)
}

/// Router for the whole application over a fresh, empty catalog.
pub fn app_router(settings: &Settings) -> anyhow::Result<Router> {
    let registry = app_registry(BookService::shared())?;
    Ok(catalog_http::build_router(&registry, settings))
}

/// Run the application until a shutdown signal arrives.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let registry = app_registry(BookService::shared())?;
    let ctx = InitCtx {
        settings: &settings,
    };

    registry
        .init_modules(&ctx)
        .await
        .context("module initialization failed")?;
    registry
        .start_modules(&ctx)
        .await
        .context("module startup failed")?;

    let served = catalog_http::start_server(&registry, &settings).await;

    registry
        .stop_modules()
        .await
        .context("module shutdown failed")?;

    served
}
