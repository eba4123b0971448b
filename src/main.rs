//! AIConverse - conversational chat API
//!
//! Serves chat replies from Gemini, keeps saved conversations in a local
//! JSON file, and computes analytics over the saved history.
//!
//! Only one process may use a data directory at a time: the store rewrites
//! its file on every mutation without locking.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod conversation;
mod core;
mod export;
mod providers;
mod routes;

use config::{prompts, Config, PromptBook, QuickTemplate, Settings};
use core::{ChatEngine, ConversationStore};
use providers::{GeminiBackend, GeminiConfig, GenerationError, ModelClient};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: ConversationStore,
    /// `None` when no API key is configured
    pub chat_engine: Option<Arc<ChatEngine>>,
    pub templates: Arc<Vec<QuickTemplate>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aiconverse=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let settings = config.load_settings()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let store = ConversationStore::new(&config.data_dir);
    store.initialize().await?;
    tracing::info!("💾 Conversations stored in {}", store.conversations_path().display());

    let chat_engine = match build_client(&config, &settings) {
        Ok(client) => {
            tracing::info!("🤖 Using model {}", client.model());
            Some(Arc::new(ChatEngine::new(Arc::new(client))))
        }
        Err(GenerationError::NotConfigured(reason)) => {
            tracing::warn!("🔑 Chat disabled, {}. Set GOOGLE_API_KEY in .env", reason);
            None
        }
        Err(e) => return Err(e.into()),
    };

    let mut templates = prompts::builtin_templates();
    templates.extend(settings.templates.iter().cloned());

    let state = AppState {
        store,
        chat_engine,
        templates: Arc::new(templates),
    };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("🚀 AIConverse API running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Surfaces a missing key as `NotConfigured` before any request is made
fn build_client(config: &Config, settings: &Settings) -> Result<ModelClient, GenerationError> {
    let api_key = config
        .google_api_key
        .clone()
        .ok_or_else(|| GenerationError::NotConfigured("no API key".into()))?;

    let backend = GeminiBackend::new(
        GeminiConfig::new(api_key)
            .with_base_url(&config.gemini_base_url)
            .with_model(&config.gemini_model)
            .with_timeout_secs(settings.model.timeout_secs),
    )?;

    Ok(ModelClient::new(Arc::new(backend))
        .with_prompts(PromptBook::new().with_overrides(&settings.prompts))
        .with_settings(settings.model.clone()))
}
