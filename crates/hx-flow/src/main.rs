use hx_cache::redis::RedisCache;
use hx_channel::redis::RedisChannel;
use hx_flow::config::Config;
use hx_flow::issuer::TokenIssuer;
use hx_token::signer::TokenSigner;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "token_issuer=debug,hx_flow=debug,hx_channel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Token Issuer");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Configuration loaded successfully");

    // A bad signing key is a deploy error; fail before touching the broker.
    let signer = TokenSigner::from_pem(config.private_key_pem.expose_secret()).map_err(|e| {
        error!("Failed to load signing key: {}", e);
        e
    })?;

    info!("Signing key loaded");

    info!("Connecting to cache...");
    let cache = RedisCache::connect_with_backoff(&config.cache_url, config.connect_max_attempts)
        .await
        .map_err(|e| {
            error!("Failed to connect to cache: {}", e);
            e
        })?;

    info!("Cache connection established");

    info!("Connecting to message broker...");
    let channel =
        RedisChannel::connect_with_backoff(&config.broker_url, config.connect_max_attempts)
            .await
            .map_err(|e| {
                error!("Failed to connect to message broker: {}", e);
                e
            })?;

    info!("Broker connection established");

    let issuer = Arc::new(TokenIssuer::new(
        Arc::new(cache),
        Arc::new(channel),
        signer,
        config.token_expiry_minutes,
    ));

    let consumer = issuer.start().await.map_err(|e| {
        error!("Failed to start token request consumer: {}", e);
        e
    })?;

    info!("Token Issuer consuming token requests");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping consumer");
    consumer.abort();

    Ok(())
}
