pub mod resiliency;
pub mod session;

pub use resiliency::{circuit_breaker_middleware, CircuitBreaker};
pub use session::{session_middleware, Session, SessionConfig, SESSION_COOKIE};
