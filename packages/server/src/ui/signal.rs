//! Shutdown triggers.

use std::io::BufRead;

use tokio::sync::oneshot;

/// Resolves once the server should shut down.
///
/// Triggers: Ctrl+C, SIGTERM (Unix), or `q` followed by Enter on the console.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
        _ = console_quit() => tracing::info!("Received quit command, shutting down"),
    }
}

/// Waits for a quit command on stdin.
///
/// Stdin is read on a plain thread so a blocked read never holds up runtime
/// shutdown. If stdin closes first this never resolves.
async fn console_quit() {
    let (tx, rx) = oneshot::channel();
    let spawned = std::thread::Builder::new()
        .name("console-quit".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) if is_quit_command(&line) => {
                        let _ = tx.send(());
                        return;
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("Failed to start console reader: {}", e);
    }

    if rx.await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// `q` or `Q`, surrounding whitespace ignored
pub fn is_quit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("q")
}
