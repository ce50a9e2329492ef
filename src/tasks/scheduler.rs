use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use crate::core::state::AppState;
use crate::tasks::pdf_render;

const RENDER_WORKER_CONCURRENCY: usize = 2;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut handles = Vec::with_capacity(RENDER_WORKER_CONCURRENCY);
    for _ in 0..RENDER_WORKER_CONCURRENCY {
        handles.push(tokio::spawn(render_worker(state.clone(), shutdown_rx.clone())));
    }

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn render_worker(state: AppState, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        match pdf_render::process_next(&state).await {
            Ok(true) => continue,
            Ok(false) => {}
            Err(err) => tracing::error!(error = %err, "Failed to process render job"),
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(Duration::from_secs(2)) => {}
        }
    }
}
