// [[RARO]]/apps/insight-kernel/src/main.rs
// Purpose: Entry point. Reads config, builds the ledger, serves the router.
// Architecture: Application Boot
// Dependencies: Axum, Tokio

use std::sync::Arc;

use anyhow::Context;
use insight_kernel::config::KernelConfig;
use insight_kernel::ledger::RunLedger;
use insight_kernel::{observability, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_tracing();

    tracing::info!("Initializing Insight Kernel...");

    let config = KernelConfig::from_env().context("Invalid kernel configuration")?;
    let ledger = Arc::new(RunLedger::new(config.max_events_per_run));
    let app = server::router(ledger);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(
        "Insight Kernel listening on http://{} (max {} events per run)",
        addr,
        config.max_events_per_run
    );

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
