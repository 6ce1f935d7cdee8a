//! Idea Improvement Relay - Rust Backend
//!
//! 使用 axum 框架构建的后端服务，把用户的网站想法转发给 Gemini 改写成结构化提示词。

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod error;
mod llm;
mod models;
mod services;
mod state;
#[cfg(test)]
mod testkit;
mod utils;

use api::create_app;
use config::AppConfig;
use state::create_shared_state;
use utils::mask_api_key;

/// 等待 Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 读取 .env（不存在时忽略）
    let _ = dotenvy::dotenv();

    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "idea_relay=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Idea Improvement Relay...");

    // 缺少 API 密钥时拒绝启动
    let config = AppConfig::load().context("failed to load configuration")?;
    info!(
        "Config loaded: model={}, api_key={}",
        config.model,
        mask_api_key(&config.api_key)
    );

    // 创建共享状态（模型客户端和模板只构建一次）
    let state = create_shared_state(&config).context("failed to create model client")?;

    let app = create_app(state);

    let addr = config.bind_addr()?;
    info!("Server listening on: {}", addr);

    // 启动服务器
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
