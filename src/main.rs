//! NCS Concierge - LINE chat front end for a hosted assistant
//!
//! Debounces customer messages into turns, runs each turn through the remote
//! assistant with local pricing and scheduling tools, and replies on LINE.

mod answer_cache;
mod api;
mod assistant;
mod config;
mod debounce;
mod line;
mod orchestrator;
mod reply;
mod run_machine;
mod sessions;
mod tools;

use answer_cache::AnswerCache;
use api::{create_router, AppState};
use assistant::{AssistantApi, LoggingAssistant, OpenAiAssistants};
use config::Config;
use debounce::{DebounceSettings, Debouncer};
use line::LineClient;
use orchestrator::Orchestrator;
use reply::ReplyClassifier;
use sessions::SessionRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tools::{PricingTable, SlotsTool, ToolRegistry};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ncs_concierge=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;

    let assistant = OpenAiAssistants::new(&config.assistant, config.http_timeout)?;
    let assistant: Arc<dyn AssistantApi> = Arc::new(LoggingAssistant::new(Arc::new(assistant)));
    if let Some(missing) = assistant.missing_configuration() {
        tracing::warn!(missing, "Assistant not configured; every turn will get an apology");
    }

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    let pricing = match PricingTable::load(&config.pricing_config_path) {
        Ok(table) => {
            tracing::info!(path = %config.pricing_config_path.display(), "Pricing table loaded");
            Some(Arc::new(table))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Pricing table unavailable, pricing tool will report not ready");
            None
        }
    };
    if config.slots_endpoint.is_none() {
        tracing::warn!("SLOTS_ENDPOINT_URL not set, slot lookups will fail");
    }
    let tools = Arc::new(ToolRegistry::standard(
        pricing,
        SlotsTool::new(config.slots_endpoint.clone(), http.clone()),
    ));
    tracing::info!(tools = ?tools.names(), "Tool registry initialized");

    let line = Arc::new(LineClient::new(&config.line, http));
    let sessions = Arc::new(SessionRegistry::new(config.session_idle_ttl));

    let orchestrator = Orchestrator::new(
        assistant,
        Arc::clone(&sessions),
        tools.clone(),
        line.clone(),
        line,
        AnswerCache::new(ReplyClassifier::new(config.reply_min_chars)),
        config.run,
    );
    let debouncer = Arc::new(Debouncer::new(
        Arc::new(orchestrator),
        DebounceSettings {
            window: config.debounce_window,
            actor_idle: config.actor_idle,
        },
    ));

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(Arc::clone(&sessions).run_sweeper(shutdown.clone()));

    let app = create_router(AppState::new(debouncer, tools)).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        %addr,
        debounce_secs = config.debounce_window.as_secs(),
        max_polls = config.run.max_polls,
        "NCS Concierge listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown requested");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Session sweeper ended abnormally");
    }
    Ok(())
}
