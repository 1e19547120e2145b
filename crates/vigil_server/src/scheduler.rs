//! Single-shot retry timers.
//!
//! Each deferred retry (admin reload, ban recheck, queue drain) is one owned
//! handle that is absent while idle. A timer is armed on failure and either
//! cancelled when superseded by a success or cleared by its own callback
//! when it fires; it is never a free-running interval, so a slow attempt can
//! never overlap the next one.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

#[derive(Default)]
pub struct RetryTimer {
    handle: Option<JoinHandle<()>>,
}

impl RetryTimer {
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Arms the timer: after `delay`, `task` runs once. Any previously armed
    /// timer is aborted first.
    pub fn arm<F>(&mut self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            sleep(delay).await;
            task.await;
        }));
    }

    /// Aborts a pending timer, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Drops the handle without aborting. Only the fired callback calls
    /// this, to mark the timer idle while its own task is still running.
    pub fn clear(&mut self) {
        self.handle = None;
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = RetryTimer::new();

        let counter = fired.clone();
        timer.arm(Duration::from_secs(45), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_secs(46)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = RetryTimer::new();

        let counter = fired.clone();
        timer.arm(Duration::from_secs(45), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel();
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_supersedes_previous_timer() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = RetryTimer::new();

        let first = fired.clone();
        timer.arm(Duration::from_secs(10), async move {
            first.fetch_add(1, Ordering::SeqCst);
        });
        let second = fired.clone();
        timer.arm(Duration::from_secs(30), async move {
            second.fetch_add(10, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }
}
