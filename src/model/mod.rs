pub mod common;
pub mod endpoint;
pub mod user;

pub use common::*;
pub use endpoint::*;
pub use user::*;
