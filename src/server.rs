use crate::{
    exposition::Exporter,
    router::create_router,
};
use axum::serve;
use color_eyre::Result;
use eyre::Context as _;
use queue_it_collector::{
    Catalog,
    CollectorSettings,
    Coordinator,
    HttpTransport,
    QueueItClient,
};
use queue_it_exporter_config::Settings;
use std::{
    net::SocketAddr,
    sync::Arc,
};
use tokio::net::TcpListener;

/// Serves the exporter until Ctrl-C or SIGTERM.
pub async fn run(settings: Settings) -> Result<()> {
    let transport = HttpTransport::new(
        settings.queue_it_base_url.clone(),
        settings.api_key.expose(),
        settings.request_timeout,
    )?;
    let coordinator = Coordinator::new(
        QueueItClient::new(transport),
        Catalog::default(),
        CollectorSettings {
            omit_test_rooms: settings.omit_test_waiting_rooms,
            max_concurrent_requests: settings.max_concurrent_requests,
            scrape_timeout: settings.scrape_timeout,
        },
    );
    let app = create_router(
        Arc::new(Exporter::new(coordinator)),
        &settings.metrics_path,
        &settings.healthz_path,
    );

    let listener = bind(settings.listen_address).await?;
    info!(
        address = %settings.listen_address,
        metrics_path = %settings.metrics_path,
        base_url = %settings.queue_it_base_url,
        "listening"
    );

    serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("shut down");
    Ok(())
}

async fn bind(address: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(address)
        .await
        .wrap_err_with(|| format!("cannot listen on {address}"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "cannot listen for SIGTERM");
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

    info!("received shutdown signal");
}
