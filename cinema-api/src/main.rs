use anyhow::Context;
use cinema_api::{app, AppState, Collaborators, Settings};
use cinema_client::{ApiClient, IdentityToolkitProvider};
use cinema_core::identity::{IdentityProvider, MockIdentityProvider};
use cinema_core::payment::SimulatedPaymentAdapter;
use cinema_core::storage::SessionStorage;
use cinema_store::app_config::{IdentityProviderKind, StorageBackend};
use cinema_store::{Config, MemoryStorage, RedisStorage};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinema_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Cinema API on port {}", config.server.port);

    let timeout = Duration::from_millis(config.backend.timeout_ms);
    let api_client = Arc::new(ApiClient::new(&config.backend.base_url, timeout)?);

    let identity: Arc<dyn IdentityProvider> = match config.identity.provider {
        IdentityProviderKind::IdentityToolkit => Arc::new(IdentityToolkitProvider::new(
            &config.identity.api_key,
            &config.identity.base_url,
            &config.identity.token_url,
            timeout,
        )?),
        IdentityProviderKind::Backend => api_client.clone(),
        IdentityProviderKind::Mock => {
            tracing::warn!("Using the in-memory identity provider");
            Arc::new(MockIdentityProvider::new())
        }
    };

    let storage: Arc<dyn SessionStorage> = match config.storage.backend {
        StorageBackend::Redis => {
            let url = config
                .storage
                .redis_url
                .as_deref()
                .context("storage.redis_url is required for the redis backend")?;
            Arc::new(RedisStorage::new(url, config.auth.session_ttl_seconds).context("Failed to open Redis client")?)
        }
        StorageBackend::Memory => Arc::new(MemoryStorage::new(config.auth.session_ttl_seconds)),
    };

    let app_state = AppState::new(
        Collaborators {
            catalog: api_client.clone(),
            admin_catalog: api_client.clone(),
            auth_backend: api_client,
            identity,
            storage,
            payments: Arc::new(SimulatedPaymentAdapter::new(Duration::from_millis(
                config.booking.payment_delay_ms,
            ))),
        },
        Settings::from_config(&config),
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
