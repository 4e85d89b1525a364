// # Camera Readiness
//
// A freshly opened camera is not ready for still capture until its video sink
// has decoded a frame. Some sinks never report "playing", so readiness is the
// first of two signals: the playing event, or a fallback timer. Whichever loses
// the race is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How the readiness race ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// The playing event arrived first.
    Playing,
    /// The fallback timer fired first.
    TimedOut,
    /// The gate was cancelled before either signal.
    Cancelled,
}

/// Race between the video sink's playing event and a fallback timer.
///
/// Must be armed inside a Tokio runtime.
pub struct ReadinessGate {
    ready: Arc<watch::Sender<bool>>,
    playing: Option<oneshot::Sender<()>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<ReadyOutcome>>,
}

impl ReadinessGate {
    /// Start the race. `timeout` is the fallback delay.
    pub fn arm(timeout: Duration) -> Self {
        let (ready_tx, _) = watch::channel(false);
        let ready = Arc::new(ready_tx);
        let (playing_tx, playing_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        let task_ready = ready.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = task_cancel.cancelled() => ReadyOutcome::Cancelled,
                signal = playing_rx => match signal {
                    Ok(()) => ReadyOutcome::Playing,
                    Err(_) => ReadyOutcome::Cancelled,
                },
                _ = tokio::time::sleep(timeout) => ReadyOutcome::TimedOut,
            };
            if outcome == ReadyOutcome::TimedOut {
                debug!(?timeout, "Camera did not report playing; forcing readiness");
                task_ready.send_replace(true);
            }
            outcome
        });

        Self {
            ready,
            playing: Some(playing_tx),
            cancel,
            task: Some(task),
        }
    }

    /// Record the playing event. Readiness flips immediately and the fallback
    /// timer is cancelled.
    pub fn signal_playing(&mut self) {
        self.ready.send_replace(true);
        if let Some(tx) = self.playing.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Resolves once the gate is ready. Returns false if the gate was cancelled first.
    pub async fn wait_ready(&self) -> bool {
        let mut rx = self.ready.subscribe();
        let cancel = self.cancel.clone();
        tokio::select! {
            biased;
            res = rx.wait_for(|ready| *ready) => res.is_ok(),
            _ = cancel.cancelled() => self.is_ready(),
        }
    }

    /// Stop the fallback timer without marking the gate ready.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.playing = None;
    }

    /// Cancel (if still pending) and report how the race ended.
    pub async fn finish(mut self) -> ReadyOutcome {
        if !self.is_ready() {
            self.cancel.cancel();
        }
        let task = self.task.take();
        match task {
            Some(handle) => handle.await.unwrap_or(ReadyOutcome::Cancelled),
            None => ReadyOutcome::Cancelled,
        }
    }
}

impl Drop for ReadinessGate {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessGate")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    const FALLBACK: Duration = Duration::from_secs(3);

    #[tokio::test(start_paused = true)]
    async fn test_playing_event_wins() {
        let mut gate = ReadinessGate::arm(FALLBACK);
        assert!(!gate.is_ready());
        gate.signal_playing();
        assert!(gate.is_ready());
        assert_eq!(gate.finish().await, ReadyOutcome::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_forces_readiness_after_exactly_one_delay() {
        let gate = ReadinessGate::arm(FALLBACK);
        let start = Instant::now();
        assert!(gate.wait_ready().await);
        assert_eq!(start.elapsed(), FALLBACK);
        assert!(gate.is_ready());
        assert_eq!(gate.finish().await, ReadyOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_ready_before_timeout() {
        let gate = ReadinessGate::arm(FALLBACK);
        tokio::time::sleep(FALLBACK - Duration::from_millis(1)).await;
        assert!(!gate.is_ready());
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(gate.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_timer() {
        let mut gate = ReadinessGate::arm(FALLBACK);
        gate.cancel();
        tokio::time::sleep(FALLBACK * 2).await;
        assert!(!gate.is_ready());
        assert!(!gate.wait_ready().await);
        assert_eq!(gate.finish().await, ReadyOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_playing_after_timeout_is_harmless() {
        let mut gate = ReadinessGate::arm(FALLBACK);
        tokio::time::sleep(FALLBACK + Duration::from_millis(1)).await;
        assert!(gate.is_ready());
        gate.signal_playing();
        assert!(gate.is_ready());
    }
}
