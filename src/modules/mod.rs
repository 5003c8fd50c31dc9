pub mod authors;
pub mod books;

use libris_kernel::ModuleRegistry;

use crate::state::AppState;

/// Register all resource modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, state: &AppState) -> anyhow::Result<()> {
    registry.register(authors::create_module(state))?;
    registry.register(books::create_module(state))?;
    Ok(())
}
