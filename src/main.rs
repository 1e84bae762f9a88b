//! Storefront Cart - guest/account cart reconciliation and checkout pricing service

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_cart::api::{self, AppState};
use storefront_cart::config::AppConfig;
use storefront_cart::pricing::PricingEngine;
use storefront_cart::publisher::{EventPublisher, LogPublisher, NatsPublisher};
use storefront_cart::remote::{HttpOrderGateway, HttpRemoteCart, InMemoryOrderGateway, InMemoryRemoteCart, OrderGateway, RemoteCartApi};
use storefront_cart::service::CartService;
use storefront_cart::storage::{MemorySessionStorage, PgSessionStorage, SessionStorage};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;

    let storage: Arc<dyn SessionStorage> = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            let pg = PgSessionStorage::new(db);
            let purged = pg.purge_older_than(config.session_ttl_secs).await?;
            tracing::info!(purged, "session storage ready");
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, guest carts are kept in memory");
            Arc::new(MemorySessionStorage::new())
        }
    };

    let remote: Arc<dyn RemoteCartApi> = match &config.cart_api_url {
        Some(url) => Arc::new(HttpRemoteCart::new(url, config.api_timeout)?),
        None => {
            tracing::warn!("CART_API_URL not set, account carts are kept in memory");
            Arc::new(InMemoryRemoteCart::new())
        }
    };
    let orders: Arc<dyn OrderGateway> = match &config.order_api_url {
        Some(url) => Arc::new(HttpOrderGateway::new(url, config.api_timeout)?),
        None => Arc::new(InMemoryOrderGateway::new()),
    };

    let publisher: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsPublisher::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events are only logged");
                Arc::new(LogPublisher)
            }
        },
        None => Arc::new(LogPublisher),
    };

    let carts = CartService::new(storage, remote).with_publisher(publisher.clone());
    let state = AppState { carts, pricing: PricingEngine::new(config.shipping_rates.clone()), orders, publisher };
    let app = api::router(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    tracing::info!("Storefront cart service listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
