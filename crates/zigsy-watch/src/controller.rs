use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use zigsy_core::error::{Result, ZigsyError};

/// Handle to a running watcher task.
///
/// The watcher owns a child of the token it was started with, so it can be
/// stopped on its own or together with everything else by cancelling the
/// parent.
pub struct WatcherHandle {
    name: &'static str,
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    pub fn new(name: &'static str, cancel_token: CancellationToken, handle: JoinHandle<()>) -> Self {
        Self {
            name,
            cancel_token,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the watcher and wait for its loop to exit.
    pub async fn stop(mut self) -> Result<()> {
        self.cancel_token.cancel();

        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        match handle.await {
            Ok(()) => {
                info!(watcher = self.name, "Watcher stopped");
                Ok(())
            }
            Err(e) => {
                warn!(watcher = self.name, error = %e, "Watcher task failed to join");
                Err(ZigsyError::Watcher(format!("{}: {}", self.name, e)))
            }
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel_token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_cancels_loop() {
        let token = CancellationToken::new();
        let child = token.child_token();
        let loop_token = child.clone();
        let handle = tokio::spawn(async move {
            loop_token.cancelled().await;
        });

        let watcher = WatcherHandle::new("test", child, handle);
        assert!(watcher.is_running());
        watcher.stop().await.unwrap();
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_parent_cancel_stops_child() {
        let token = CancellationToken::new();
        let child = token.child_token();
        let loop_token = child.clone();
        let handle = tokio::spawn(async move {
            loop_token.cancelled().await;
        });
        let watcher = WatcherHandle::new("test", child, handle);

        token.cancel();
        watcher.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_panicked_task_reports_error() {
        let token = CancellationToken::new();
        let handle = tokio::spawn(async {
            panic!("boom");
        });
        let watcher = WatcherHandle::new("broken", token, handle);
        assert!(matches!(watcher.stop().await, Err(ZigsyError::Watcher(_))));
    }
}
