use std::sync::Arc;

use jobforge::agents::AgentRegistry;
use jobforge::analytics::Analytics;
use jobforge::config::EngineConfig;
use jobforge::dispatch::Dispatcher;
use jobforge::metrics::Metrics;
use jobforge::store::keys;
use jobforge::store::{IndexedStore, LibSqlStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = EngineConfig::from_env();
    let db_path =
        std::env::var("JOBFORGE_DB_PATH").unwrap_or_else(|_| "./data/jobforge.db".to_string());

    eprintln!("jobforge v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Store: {db_path}");

    let store: Arc<dyn IndexedStore> =
        Arc::new(LibSqlStore::new_local(std::path::Path::new(&db_path)).await?);
    store.ping().await?;

    let metrics = Arc::new(Metrics::new());
    let registry = AgentRegistry::new(store.clone());
    registry.ensure_defaults().await?;

    let dispatcher = Dispatcher::new(store.clone(), registry.clone(), metrics.clone());
    let analytics = Analytics::new(store.clone(), metrics, config);

    let agents = registry.list(50).await?;
    eprintln!("   Agents: {}", agents.len());
    for agent in &agents {
        eprintln!("     - {} ({}, {} tasks)", agent.name, agent.role, agent.task_count);
    }
    for queue in keys::ALL_QUEUES {
        eprintln!("   {}: {} waiting", queue, dispatcher.queue_len(queue).await?);
    }

    let snapshot = analytics.snapshot().await?;
    eprintln!(
        "   Results: {} total, {} in the last hour",
        snapshot.totals.results, snapshot.window.h1
    );
    eprintln!(
        "   Worker heartbeat: {}",
        if analytics.worker_alive().await? {
            "alive"
        } else {
            "not seen"
        }
    );

    Ok(())
}
