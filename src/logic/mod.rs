pub mod materialize;
pub mod resolve;
pub mod validate;

pub use materialize::materialize_routes;
pub use resolve::ResolverContext;
pub use validate::{ValidationErrors, Validator};
