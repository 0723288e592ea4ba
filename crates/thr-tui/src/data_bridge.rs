//! Data bridge — connects [`Registry`] snapshots to TUI actions.
//!
//! Runs as a background task: loads the family list once, then forwards
//! every directory and controls snapshot as an [`Action`] until cancelled.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use thr_core::Registry;

use crate::action::Action;

pub async fn spawn_data_bridge(
    registry: Registry,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut directory = registry.directory().subscribe();
    let mut controls = registry.controls().subscribe();

    // Initial snapshots so the screen draws immediately
    let _ = action_tx.send(Action::DirectoryUpdated(Box::new(
        directory.borrow_and_update().clone(),
    )));
    let _ = action_tx.send(Action::ControlsUpdated(Box::new(
        controls.borrow_and_update().clone(),
    )));

    // The failure itself reaches the UI through the directory snapshot
    let loader = registry.clone();
    tokio::spawn(async move {
        if let Err(e) = loader.directory().load_families().await {
            warn!(error = %e, "initial family load failed");
        }
    });

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Ok(()) = directory.changed() => {
                let view = directory.borrow_and_update().clone();
                debug!(
                    families = view.families.len(),
                    technologies = view.technologies.len(),
                    "dispatching DirectoryUpdated"
                );
                let _ = action_tx.send(Action::DirectoryUpdated(Box::new(view)));
            }
            Ok(()) = controls.changed() => {
                let view = controls.borrow_and_update().clone();
                debug!(rows = view.controls.len(), loading = view.loading, "dispatching ControlsUpdated");
                let _ = action_tx.send(Action::ControlsUpdated(Box::new(view)));
            }
            else => break,
        }
    }

    debug!("data bridge shut down");
}
