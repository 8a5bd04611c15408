use mimalloc::MiMalloc;
use std::net::SocketAddr;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vectorshop::config::Config;
use vectorshop::relay::{self, FeedSource};
use vectorshop::server::{AppState, app_router};
use vectorshop::supabase::SupabaseClient;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::from_sources();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let anon_key = if cfg.supabase.anon_key.is_empty() {
        "<none>"
    } else {
        "<redacted>"
    };
    info!(
        supabase_url = %cfg.supabase.url.as_ref().map_or("<none>", |u| u.as_str()),
        anon_key = %anon_key,
        proxy = %cfg.supabase.proxy.as_ref().map_or("<none>", |u| u.as_str()),
        loglevel = %cfg.basic.loglevel,
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        static_dir = %cfg.basic.static_dir.display(),
        cash_on_delivery_method_id = %cfg.store.cash_on_delivery_method_id,
        ws_ping_secs = cfg.store.ws_ping_secs,
        "Configuration loaded"
    );

    let supabase = SupabaseClient::from_config(&cfg.supabase)?;

    let source = match FeedSource::new(supabase.clone()) {
        Ok(source) => Some(source),
        Err(e) => {
            warn!(error = %e, "Realtime unavailable; WebSocket clients will not receive pushes");
            None
        }
    };
    let relay = relay::spawn(source.clone()).await?;
    if let Some(source) = source {
        relay::spawn_leaderboard_feed(source, relay.clone());
    }

    let state = AppState::new(
        supabase,
        relay,
        cfg.store.clone(),
        cfg.basic.static_dir.clone(),
    );
    let app = app_router(state);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
