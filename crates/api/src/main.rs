use anyhow::Context;

use allowgate_api::app::build_app;
use allowgate_api::config::GateConfig;
use allowgate_auth::AuthorizationGate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    allowgate_observability::init();

    let config = GateConfig::from_env().context("invalid gate configuration")?;
    let source = config
        .build_source()
        .context("failed to build allowlist source")?;
    let gate = AuthorizationGate::new(source);
    tracing::info!(strategy = gate.strategy(), "allowlist source ready");

    let app = build_app(gate);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
