mod router;
mod routes;
mod service_layers;

use std::{net::SocketAddr, process, sync::Arc, time::Duration};

use clap::Parser;
use common::config::ProxyConfig;
use mimalloc::MiMalloc;
use photo_cache::PhotoProxy;
use tokio::{net::TcpListener, signal};
use tracing::{debug, error, info};
use utils::logger::configure_logger;

use crate::router::build_router;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub(crate) struct ServerState {
    pub(crate) proxy: PhotoProxy,
}

#[tokio::main]
async fn main() {
    // a missing .env is normal outside local development
    let _ = dotenv::dotenv();

    configure_logger();

    let config = ProxyConfig::parse();

    if let Err(err) = config.validate() {
        error!("Invalid configuration: {err}");
        process::exit(1);
    }

    info!(
        "Proxying photos from {} using {} auth",
        config.upstream_base_url, config.auth_mode
    );

    let proxy = match PhotoProxy::from_config(&config) {
        Ok(proxy) => proxy,
        Err(err) => {
            error!("Failed to create upstream client: {err}");
            process::exit(1);
        }
    };

    let state = Arc::new(ServerState { proxy });

    if let Some(ttl) = config.cache_ttl() {
        spawn_cache_sweeper(state.clone(), ttl);
    }

    let address = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let listener = match TcpListener::bind(address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind {address}: {err}");
            process::exit(1);
        }
    };

    info!("Listening on {address}");

    if let Err(err) = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server stopped unexpectedly: {err}");
    }

    metrics::shutdown();

    info!("Shut down");
}

fn spawn_cache_sweeper(state: Arc<ServerState>, ttl: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ttl);

        loop {
            interval.tick().await;

            let purged = state.proxy.purge_expired().await;
            if purged > 0 {
                debug!("Purged {purged} expired photos");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
