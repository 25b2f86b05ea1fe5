pub mod api_client;
pub mod identity_toolkit;

pub use api_client::ApiClient;
pub use identity_toolkit::IdentityToolkitProvider;
