use cinema_booking::{BookingFlow, PaymentProcessor};
use cinema_core::identity::IdentityProvider;
use cinema_core::messages::Locale;
use cinema_core::payment::PaymentAdapter;
use cinema_core::repository::{AdminCatalog, AuthBackend, MovieCatalog};
use cinema_core::storage::SessionStorage;
use cinema_shared::Theme;
use cinema_store::Config;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthContext;
use crate::middleware::{CircuitBreaker, SessionConfig};

/// External collaborators, each behind its trait.
pub struct Collaborators {
    pub catalog: Arc<dyn MovieCatalog>,
    pub admin_catalog: Arc<dyn AdminCatalog>,
    pub auth_backend: Arc<dyn AuthBackend>,
    pub identity: Arc<dyn IdentityProvider>,
    pub storage: Arc<dyn SessionStorage>,
    pub payments: Arc<dyn PaymentAdapter>,
}

#[derive(Clone)]
pub struct Settings {
    pub session_secret: String,
    pub session_ttl_seconds: u64,
    pub resolve_roles: bool,
    pub max_tickets: u8,
    pub locale: Locale,
    pub default_theme: Theme,
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session_secret: config.auth.jwt_secret.clone(),
            session_ttl_seconds: config.auth.session_ttl_seconds,
            resolve_roles: config.auth.resolve_roles,
            max_tickets: config.booking.max_tickets,
            locale: config.ui.locale,
            default_theme: config.ui.default_theme,
            failure_threshold: config.resiliency.failure_threshold,
            reset_timeout: Duration::from_secs(config.resiliency.reset_timeout_seconds),
        }
    }
}

pub struct ResiliencyState {
    pub backend_cb: CircuitBreaker,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn MovieCatalog>,
    pub admin_catalog: Arc<dyn AdminCatalog>,
    pub storage: Arc<dyn SessionStorage>,
    pub auth: AuthContext,
    pub booking: BookingFlow,
    pub payments: Arc<PaymentProcessor>,
    pub session: SessionConfig,
    pub default_theme: Theme,
    pub resiliency: Arc<ResiliencyState>,
}

impl AppState {
    pub fn new(collaborators: Collaborators, settings: Settings) -> Self {
        let Collaborators {
            catalog,
            admin_catalog,
            auth_backend,
            identity,
            storage,
            payments,
        } = collaborators;

        Self {
            auth: AuthContext::new(
                identity,
                auth_backend,
                storage.clone(),
                settings.resolve_roles,
                settings.locale,
            ),
            booking: BookingFlow::new(storage.clone(), settings.max_tickets),
            payments: Arc::new(PaymentProcessor::new(payments)),
            session: SessionConfig {
                secret: settings.session_secret,
                ttl_seconds: settings.session_ttl_seconds,
            },
            default_theme: settings.default_theme,
            resiliency: Arc::new(ResiliencyState {
                backend_cb: CircuitBreaker::new("backend", settings.failure_threshold, settings.reset_timeout),
            }),
            catalog,
            admin_catalog,
            storage,
        }
    }
}
