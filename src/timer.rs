use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep, sleep};

/// One-shot rearmable timer handle.
///
/// At most one deadline is pending per concern; rearming replaces it and
/// disarming makes the owning select arm ineligible. Keeping the handle as
/// an explicit field makes every cancel/rearm an auditable state change.
#[derive(Debug)]
pub struct RearmTimer {
    sleep: Pin<Box<Sleep>>,
    armed: bool,
}

impl RearmTimer {
    pub fn new() -> Self {
        Self {
            sleep: Box::pin(sleep(Duration::ZERO)),
            armed: false,
        }
    }

    /// Replace any pending deadline with `after` from now.
    pub fn rearm(&mut self, after: Duration) {
        self.sleep.as_mut().reset(Instant::now() + after);
        self.armed = true;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Await the pending deadline. Callers guard the select arm with
    /// `is_armed`; polling an unarmed timer would complete immediately.
    pub async fn fired(&mut self) {
        self.sleep.as_mut().await;
        self.armed = false;
    }
}

impl Default for RearmTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_disarmed() {
        let timer = RearmTimer::new();
        assert!(!timer.is_armed());
    }

    #[tokio::test]
    async fn fires_after_rearm_and_disarms_itself() {
        let mut timer = RearmTimer::new();
        timer.rearm(Duration::from_millis(10));
        assert!(timer.is_armed());
        timer.fired().await;
        assert!(!timer.is_armed());
    }

    #[tokio::test]
    async fn rearm_replaces_the_pending_deadline() {
        let mut timer = RearmTimer::new();
        timer.rearm(Duration::from_secs(60));
        timer.rearm(Duration::from_millis(10));
        let started = Instant::now();
        timer.fired().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn reusable_after_firing() {
        let mut timer = RearmTimer::new();
        timer.rearm(Duration::from_millis(5));
        timer.fired().await;
        timer.rearm(Duration::from_millis(5));
        timer.fired().await;
        assert!(!timer.is_armed());
    }
}
