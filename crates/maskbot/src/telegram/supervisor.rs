//! Dispatcher supervision
//!
//! Each dispatcher generation runs in its own task so a panic inside teloxide
//! surfaces as a `JoinError` instead of taking the process down. A panicked
//! generation is restarted with backoff until the schedule runs out; a
//! generation that returns (shutdown or polling conflict) is final.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use maskcore::retry::RetryConfig;

/// Aborts the generation task when the supervisor itself goes away.
struct Generation(JoinHandle<()>);

impl Drop for Generation {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs generations from `start` until one returns, the schedule is
/// exhausted, or `stop` is raised.
///
/// Every generation receives the stop signal and is expected to wind down
/// once it flips to `true`.
pub async fn supervise<F, Fut>(policy: &RetryConfig, stop: watch::Receiver<bool>, mut start: F)
where
    F: FnMut(watch::Receiver<bool>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let max_starts = policy.max_attempts.max(1);
    let mut starts = 0;

    loop {
        if *stop.borrow() {
            break;
        }

        starts += 1;
        let mut generation = Generation(tokio::spawn(start(stop.clone())));

        match (&mut generation.0).await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(e) if e.is_panic() => {
                log::error!("Dispatcher panicked: {}", e);
                if starts >= max_starts {
                    log::error!("Dispatcher panicked {} times, giving up on the bot", starts);
                    break;
                }

                let delay = policy.delay_for_attempt(starts - 1);
                log::info!("Restarting dispatcher in {:?} (start {}/{})", delay, starts + 1, max_starts);
                let mut stop = stop.clone();
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    _ = stop.wait_for(|stopped| *stopped) => break,
                }
            }
            Err(e) => {
                log::warn!("Dispatcher task was cancelled: {}", e);
                break;
            }
        }
    }
}

/// A supervised dispatcher running in the background.
pub struct Supervised {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Supervised {
    /// Spawns [`supervise`] on the runtime.
    pub fn spawn<F, Fut>(policy: RetryConfig, start: F) -> Self
    where
        F: FnMut(watch::Receiver<bool>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop, stopped) = watch::channel(false);
        let handle = tokio::spawn(async move { supervise(&policy, stopped, start).await });
        Self { stop, handle }
    }

    /// Raises the stop signal and waits up to `timeout` for the dispatcher.
    ///
    /// A dispatcher still running after `timeout` is aborted.
    pub async fn stop(mut self, timeout: Duration) {
        self.stop.send_replace(true);

        match tokio::time::timeout(timeout, &mut self.handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Dispatcher supervisor ended abnormally: {}", e),
            Err(_) => {
                log::warn!("Dispatcher did not stop within {:?}, aborting it", timeout);
                self.handle.abort();
            }
        }
    }
}
