pub mod books;

use catalog_kernel::ModuleRegistry;

use self::books::service::SharedCatalog;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, catalog: SharedCatalog) -> anyhow::Result<()> {
    registry.register(books::create_module(catalog))?;
    Ok(())
}
