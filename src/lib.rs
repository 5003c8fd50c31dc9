//! Libris application library
//!
//! Books and authors resources served over the libris HTTP stack.

pub mod bootstrap;
pub mod links;
pub mod modules;
pub mod serialization;
pub mod state;
pub mod utils;

pub use bootstrap::Application;
pub use state::AppState;
