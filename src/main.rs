use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ansieyes::config::AppConfig;
use ansieyes::dispatch::Dispatcher;
use ansieyes::github::OctocrabHost;
use ansieyes::llm::GeminiClient;
use ansieyes::prompts::PromptConfig;
use ansieyes::server::{AppState, build_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ansieyes=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration error");
            std::process::exit(1);
        }
    };

    if config.webhook_secret.is_empty() {
        tracing::warn!("GITHUB_WEBHOOK_SECRET not set; signature verification is disabled");
    }

    let github = match OctocrabHost::from_token(config.github_token.clone()) {
        Ok(github) => github,
        Err(e) => {
            tracing::error!(error = %e, "failed to build GitHub client");
            std::process::exit(1);
        }
    };

    let llm = match GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.limits.llm_timeout,
    ) {
        Ok(llm) => llm,
        Err(e) => {
            tracing::error!(error = %e, "failed to build Gemini client");
            std::process::exit(1);
        }
    };

    let prompts = PromptConfig::load(config.prompts_path.as_deref());

    let dispatcher = Dispatcher::new(
        Arc::new(github),
        Arc::new(llm),
        prompts,
        config.limits.clone(),
        config.clone_base.clone(),
    );
    let state = AppState::new(config.webhook_secret.clone().into_bytes(), dispatcher);

    let app = build_router(state);

    tracing::info!(addr = %config.bind_addr, "starting webhook server");
    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %config.bind_addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
