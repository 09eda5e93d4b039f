// Best-effort mirror push.
//
// Committed changes are pushed to the configured remote either after
// each execution or on a background interval. Pushes are fire-and-forget:
// failures are logged and never affect request handling.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::git::{CommandExecutor, GitWorker};

/// Push once, swallowing failures. Returns whether the push succeeded so
/// tests can observe the outcome; callers on the request path ignore it.
pub fn push_once<E: CommandExecutor>(worker: &GitWorker<E>, remote: &str, branch: &str) -> bool {
    match worker.push(remote, branch) {
        Ok(_) => {
            debug!(%remote, %branch, "mirror push completed");
            true
        }
        Err(error) => {
            warn!(%remote, %branch, %error, "mirror push failed");
            false
        }
    }
}

/// Handle to a running periodic mirror task.
pub struct MirrorHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MirrorHandle {
    /// Signal the loop to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

/// Spawn the periodic push loop. Each tick performs one best-effort
/// push; a failed push simply waits for the next tick.
pub fn spawn_periodic<E>(
    worker: GitWorker<E>,
    remote: String,
    branch: String,
    interval: Duration,
) -> MirrorHandle
where
    E: CommandExecutor + Send + Sync + 'static,
{
    let (stop, mut stopped) = watch::channel(false);
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = stopped.changed() => {
                    if changed.is_err() || *stopped.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(interval) => {
                    push_once(&worker, &remote, &branch);
                }
            }
        }
        debug!("mirror push loop stopped");
    });
    MirrorHandle { stop, task }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::git::CommandResult;

    use super::*;

    #[derive(Clone)]
    struct CountingGit {
        pushes: Arc<AtomicUsize>,
        succeed: bool,
    }

    impl CommandExecutor for CountingGit {
        fn execute(
            &self,
            _program: &str,
            args: &[String],
            _cwd: &Path,
        ) -> Result<CommandResult, std::io::Error> {
            assert_eq!(args[0], "push");
            self.pushes.fetch_add(1, Ordering::SeqCst);
            Ok(CommandResult {
                success: self.succeed,
                code: Some(if self.succeed { 0 } else { 1 }),
                stdout: String::new(),
                stderr: if self.succeed { String::new() } else { "remote hung up".into() },
            })
        }
    }

    #[test]
    fn push_once_reports_success() {
        let pushes = Arc::new(AtomicUsize::new(0));
        let git = GitWorker::with_executor(
            "/tmp/repo",
            CountingGit { pushes: Arc::clone(&pushes), succeed: true },
        );
        assert!(push_once(&git, "origin", "main"));
        assert_eq!(pushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn push_once_swallows_failure() {
        let pushes = Arc::new(AtomicUsize::new(0));
        let git = GitWorker::with_executor(
            "/tmp/repo",
            CountingGit { pushes: Arc::clone(&pushes), succeed: false },
        );
        // Failure is observable but not fatal.
        assert!(!push_once(&git, "origin", "main"));
        assert_eq!(pushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_loop_pushes_every_interval() {
        let pushes = Arc::new(AtomicUsize::new(0));
        let git = GitWorker::with_executor(
            "/tmp/repo",
            CountingGit { pushes: Arc::clone(&pushes), succeed: true },
        );

        let handle = spawn_periodic(
            git,
            "origin".to_string(),
            "main".to_string(),
            Duration::from_secs(30),
        );

        tokio::time::sleep(Duration::from_secs(95)).await;
        handle.shutdown().await;

        assert_eq!(pushes.load(Ordering::SeqCst), 3, "one push per elapsed interval");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_loop_promptly() {
        let pushes = Arc::new(AtomicUsize::new(0));
        let git = GitWorker::with_executor(
            "/tmp/repo",
            CountingGit { pushes: Arc::clone(&pushes), succeed: true },
        );

        let handle = spawn_periodic(
            git,
            "origin".to_string(),
            "main".to_string(),
            Duration::from_secs(30),
        );
        handle.shutdown().await;

        assert_eq!(pushes.load(Ordering::SeqCst), 0);
    }
}
