use std::sync::Arc;

use anyhow::Context;

use blueprint_flow::cli::Repl;
use blueprint_flow::config::FlowConfig;
use blueprint_flow::session::{BlueprintRouteState, SessionRegistry, blueprint_routes};
use blueprint_flow::store::{BlueprintStore, LibSqlStore};
use blueprint_flow::suggestions::{StaticSuggestions, SuggestionProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = FlowConfig::from_env().context("invalid BLUEPRINT_* configuration")?;
    let graph = Arc::new(config.build_graph().context("failed to build stage graph")?);

    eprintln!("📐 Blueprint Flow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Flow: {} ({} stages, {} steps)",
        graph.id(),
        graph.stage_count(),
        graph.total_steps()
    );

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn BlueprintStore> = Arc::new(
        LibSqlStore::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );
    eprintln!("   Database: {}", config.db_path.display());

    let registry = Arc::new(SessionRegistry::new(
        Arc::clone(&graph),
        config.options,
        Arc::clone(&store),
    ));
    let suggestions: Arc<dyn SuggestionProvider> =
        Arc::new(StaticSuggestions::new(Arc::clone(&graph)));

    // ── HTTP ─────────────────────────────────────────────────────────────
    let app = blueprint_routes(BlueprintRouteState {
        registry: Arc::clone(&registry),
        suggestions: Arc::clone(&suggestions),
    });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port))
        .await
        .with_context(|| format!("failed to bind port {}", config.http_port))?;
    eprintln!("   HTTP API: http://0.0.0.0:{}/api/blueprints", config.http_port);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "HTTP server stopped");
        }
    });

    // ── Terminal session ─────────────────────────────────────────────────
    let session = match config.session {
        Some(id) => registry.open(id).await?,
        None => registry.create().await,
    };
    let session_id = session.lock().await.id();
    eprintln!("   Session: {session_id}");
    eprintln!("   Type your answers. /help for commands, /quit to exit.\n");

    Repl::new(registry, session, suggestions).run().await;
    Ok(())
}
