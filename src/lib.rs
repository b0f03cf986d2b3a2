pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod store;

// Export API types
pub use api::routes::{build_app, create_router};

// Export logic types
pub use logic::{materialize_routes, ResolverContext, ValidationErrors, Validator};

// Export all model types
pub use model::*;

// Export store types
pub use store::{MemoryStore, Store, StoreError};
