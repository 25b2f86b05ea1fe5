pub mod context;
pub mod guard;
pub mod routes;

pub use context::AuthContext;
pub use guard::{admin_only, require_role, staff_only};
pub use routes::routes;
