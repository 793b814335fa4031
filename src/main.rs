use elera_backend::config::Config;
use elera_backend::logging::{self, LogSettings};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    let _log_guard = logging::init_tracing(&LogSettings::from_env(&config.log_level));

    let app = elera_backend::create_app(&config).await;

    let addr = config.bind_addr();
    tracing::info!(
        %addr,
        cache_capacity = config.candidate_cache_capacity,
        cache_ttl_secs = config.candidate_cache_ttl.as_secs(),
        default_cooldown_mins = config.default_cooldown_mins,
        "elera backend listening"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind listener failed");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
