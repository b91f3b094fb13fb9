// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use chatgpt_bridge::config::Config;
use chatgpt_bridge::driver::UiDriver;
use chatgpt_bridge::http::{build_router, AppState};
use chatgpt_bridge::prompt::PromptRenderer;

/// Priority: `--log-level` / `BRIDGE_LOG_LEVEL` > `RUST_LOG` > `"info"`.
fn init_tracing(config: &Config) {
    let filter = if std::env::var("RUST_LOG").is_err() {
        EnvFilter::new(&config.log_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

/// No real UI-automation driver ships in this crate; accessibility
/// automation is an external collaborator supplied by the launcher. This
/// stands in until one is wired up, so `http` mode can at least start and
/// serve requests against the wire protocol.
fn unconfigured_driver() -> Arc<dyn UiDriver> {
    chatgpt_bridge::driver::stub::StubDriver::new(String::new())
}

async fn run_http(config: Config) -> anyhow::Result<()> {
    let marker_secret = config.marker_secret.clone().unwrap_or_else(|| {
        warn!("MARKER_SECRET not set; using an ephemeral per-process key, markers will not match across restarts");
        uuid::Uuid::new_v4().to_string()
    });

    let bind_addr = format!("{}:{}", config.http_host, config.http_port);
    let driver = unconfigured_driver();
    let prompt_renderer = PromptRenderer::new()?;
    let state = Arc::new(AppState::new(config, driver, marker_secret, prompt_renderer)?);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "chatgpt-bridge listening");
    axum::serve(listener, router).await?;
    Ok(())
}

/// The stdio tool-call transport consumes the same core through the same
/// `UiDriver` interface but is otherwise out of scope here; it is an
/// external launcher concern.
async fn run_stdio(_config: Config) -> anyhow::Result<()> {
    anyhow::bail!("stdio transport is provided by the launcher, not this binary")
}

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    let result = match config.mode.as_str() {
        "stdio" => run_stdio(config).await,
        _ => run_http(config).await,
    };

    if let Err(e) = result {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
