//! anya-server: HTTP front door for the Anya conversational gateway.
//!
//! Exposes the chat API (`/api/chat`, `/api/reset`, `/api/health`) over
//! the orchestrator, plus a CORS allowlist for browser clients. All
//! conversation and credential state lives in the gateway crate; this
//! binary is wiring.

mod cors;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use anya_config::{loader, AnyaConfig};
use anya_gateway::{
    CredentialManager, GigaChatClient, GigaChatConfig, OauthIssuer, Orchestrator, RetryPolicy,
    SessionStore,
};

use crate::routes::AppState;

#[derive(Parser)]
#[command(name = "anya-server", about = "HTTP front door for the Anya chat gateway")]
struct Args {
    /// Path to the config file. Defaults to the platform config dir.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured listen port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anya_server=info,anya_gateway=info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => loader::load_from_path(path),
        None => loader::load_default(),
    }
    .expect("failed to load config");

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if config.upstream.auth_key.is_empty() {
        tracing::warn!("no GigaChat auth key configured; set GIGACHAT_AUTH_KEY");
    }

    let state = build_state(&config);

    // Spawn the idle-session sweeper.
    let sweeper_store = Arc::clone(&state.store);
    let idle_ttl = Duration::from_secs(config.session.idle_ttl_secs);
    let sweep_interval = Duration::from_secs(config.session.sweep_interval_secs);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(sweep_interval).await;
            sweeper_store.evict_idle(idle_ttl).await;
            let count = sweeper_store.count().await;
            tracing::debug!(sessions = count, "sweeper tick");
        }
    });

    let app = routes::router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("failed to bind TCP listener");

    tracing::info!("anya-server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failure");
}

/// Construct the gateway collaborators once, from config, and wire them
/// into the shared handler state.
fn build_state(config: &AnyaConfig) -> AppState {
    let connect_timeout = Duration::from_secs(config.upstream.connect_timeout_secs);
    let request_timeout = Duration::from_secs(config.upstream.request_timeout_secs);

    let store = Arc::new(SessionStore::new(config.session.max_turns));

    let issuer = Arc::new(OauthIssuer::new(
        config.upstream.auth_key.clone(),
        config.upstream.oauth_url.clone(),
        config.upstream.scope.clone(),
        connect_timeout,
        request_timeout,
    ));
    let credentials = Arc::new(CredentialManager::new(
        issuer,
        Duration::from_secs(config.credentials.safety_margin_secs),
    ));

    let mut gigachat = GigaChatConfig::new()
        .with_api_url(config.upstream.api_url.clone())
        .with_model(config.upstream.model.clone())
        .with_max_tokens(config.upstream.max_tokens)
        .with_temperature(config.upstream.temperature)
        .with_timeouts(connect_timeout, request_timeout);
    if let Some(ref prompt) = config.upstream.system_prompt {
        gigachat = gigachat.with_system_prompt(prompt.clone());
    }
    let client = Arc::new(GigaChatClient::new(gigachat));

    let retry = RetryPolicy {
        max_attempts: config.retry.max_attempts,
        base_delay: Duration::from_millis(config.retry.base_delay_ms),
        max_delay: Duration::from_millis(config.retry.max_delay_ms),
        jitter: Duration::from_millis(config.retry.jitter_ms),
    };

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&store),
        credentials,
        client,
        retry,
    ));

    AppState {
        orchestrator,
        store,
        debug_mode: config.server.debug_mode,
        fallback_reply: config.server.fallback_reply.clone(),
        cors_origins: Arc::new(config.server.cors_origins.clone()),
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
