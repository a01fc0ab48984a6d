//! SIGINT / SIGTERM handling

use log::{info, warn};
use std::future::Future;
use std::pin::Pin;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

/// Spawn a task that flips the returned flag to `true` on SIGINT or SIGTERM.
///
/// Must be called from inside a tokio runtime.
pub fn listen() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        let name = wait_for_signal().await;
        info!("Received {}, shutting down...", name);
        // Receiver gone means the loop already finished
        let _ = tx.send(true);
    });

    rx
}

async fn wait_for_signal() -> &'static str {
    let terminate: Pin<Box<dyn Future<Output = ()> + Send>> =
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => Box::pin(async move {
                stream.recv().await;
            }),
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}", e);
                Box::pin(std::future::pending())
            }
        };

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
