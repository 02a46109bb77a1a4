use anyhow::Result;
use backdrop_config::DaemonConfig;
use backdrop_common::{
    ApplyOutcome, ErrorReporting, IpcServer, LocalVault, RotationController, RotationHandle,
};
use backdrop_common::service;

mod snippet;

use snippet::SnippetSink;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    log::info!("Starting backdrop daemon...");

    let config = DaemonConfig::load()
        .map_err(|e| {
            log::error!("Configuration error: {}", e.user_friendly_message());
            anyhow::anyhow!("Configuration error: {}", e.user_friendly_message())
        })?;

    log::info!("Vault root: {:?}", config.vault_root);
    log::info!("Settings record: {:?}", config.settings_file);
    log::info!("Style snippet: {:?}", config.snippet_path);

    let mut controller = RotationController::new(
        LocalVault::new(&config.vault_root),
        SnippetSink::new(&config.snippet_path),
        Box::new(config.settings_store()),
    );

    let (handle, rx) = RotationHandle::channel(32);
    start_ipc_server(handle.clone());
    watch_for_shutdown(handle);

    match controller.apply_configured() {
        Ok(ApplyOutcome::Applied { image, .. }) => log::info!("Initial background: {}", image),
        Ok(ApplyOutcome::NoImages) => {
            log::warn!("No background images yet, waiting for a folder to be configured")
        }
        Err(e) => e.log_error("Failed to apply initial background"),
    }

    log::info!("Daemon started successfully");

    let result = service::run(controller, rx).await;

    let socket = backdrop_common::ipc::default_socket_path();
    if let Err(e) = std::fs::remove_file(&socket) {
        log::debug!("Could not remove socket {:?}: {}", socket, e);
    }

    result.map_err(|e| {
        log::error!("Rotation service failed: {}", e.user_friendly_message());
        anyhow::anyhow!("Rotation service failed: {}", e.user_friendly_message())
    })?;

    log::info!("Daemon stopped");
    Ok(())
}

fn start_ipc_server(handle: RotationHandle) {
    std::thread::spawn(move || {
        let server = IpcServer::new();
        if let Err(e) = server.start(move |cmd| -> Result<_> { Ok(handle.blocking_request(cmd)?) }) {
            log::error!("IPC server error: {}", e);
        }
    });
}

fn watch_for_shutdown(handle: RotationHandle) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        log::info!("Received shutdown signal");
        if let Err(e) = handle.shutdown().await {
            log::warn!("Rotation service already stopped: {}", e);
        }
    });
}
