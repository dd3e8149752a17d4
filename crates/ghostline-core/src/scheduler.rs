//! Debounce / trigger scheduler
//!
//! Keeps a single-shot auto-trigger timer. Re-arming aborts the previous
//! timer first, so a burst of keystrokes produces one request. Each arm
//! bumps a generation counter; a fire that carries an older generation lost
//! a race with `disarm` and is ignored.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::session::SessionEvent;

/// Auto-trigger timer bookkeeping
pub struct TriggerScheduler {
    auto_enabled: bool,
    delay: Duration,
    generation: u64,
    timer: Option<JoinHandle<()>>,
    events: UnboundedSender<SessionEvent>,
}

impl TriggerScheduler {
    pub fn new(auto_enabled: bool, delay: Duration, events: UnboundedSender<SessionEvent>) -> Self {
        Self {
            auto_enabled,
            delay,
            generation: 0,
            timer: None,
            events,
        }
    }

    pub fn is_auto_enabled(&self) -> bool {
        self.auto_enabled
    }

    /// Enable or disable auto-trigger; disabling also disarms
    pub fn set_auto_enabled(&mut self, enabled: bool) {
        self.auto_enabled = enabled;
        if !enabled {
            self.disarm();
        }
    }

    /// Default debounce delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether a timer is armed and has not fired yet
    pub fn is_armed(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Current timer generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// (Re)arm the timer for `delay`
    ///
    /// Returns `false` when auto-trigger is disabled or no timer could be
    /// armed. Manual triggering is unaffected either way.
    pub fn schedule(&mut self, delay: Duration) -> bool {
        self.disarm();
        if !self.auto_enabled {
            return false;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot arm auto-trigger timer: {}", e);
                return false;
            }
        };

        let generation = self.generation;
        let events = self.events.clone();
        self.timer = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(SessionEvent::AutoTriggerFired { generation });
        }));
        debug!(generation, delay_ms = delay.as_millis() as u64, "Auto-trigger armed");
        true
    }

    /// Abort any armed timer
    pub fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// Claim a timer fire
    ///
    /// Returns `true` only for the fire of the currently armed timer.
    pub fn claim_fire(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.timer.is_none() {
            debug!(generation, current = self.generation, "Ignoring stale auto-trigger");
            return false;
        }
        self.timer = None;
        true
    }
}

impl Drop for TriggerScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TriggerScheduler::new(true, Duration::from_millis(100), tx);

        assert!(scheduler.schedule(Duration::from_millis(100)));
        let generation = scheduler.generation();

        match rx.recv().await {
            Some(SessionEvent::AutoTriggerFired { generation: fired }) => {
                assert_eq!(fired, generation);
                assert!(scheduler.claim_fire(fired));
                assert!(!scheduler.claim_fire(fired));
            }
            other => panic!("Expected AutoTriggerFired, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_coalesces_bursts() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TriggerScheduler::new(true, Duration::from_millis(100), tx);

        for _ in 0..5 {
            scheduler.schedule(Duration::from_millis(100));
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        let last = scheduler.generation();

        tokio::time::sleep(Duration::from_millis(200)).await;
        let mut fired = Vec::new();
        while let Ok(SessionEvent::AutoTriggerFired { generation }) = rx.try_recv() {
            fired.push(generation);
        }
        assert_eq!(fired, vec![last]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_invalidates_fire() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = TriggerScheduler::new(true, Duration::from_millis(10), tx);

        scheduler.schedule(Duration::from_millis(10));
        let armed = scheduler.generation();
        scheduler.disarm();

        assert!(!scheduler.is_armed());
        assert!(!scheduler.claim_fire(armed));
    }

    #[tokio::test]
    async fn test_disabled_scheduler_does_not_arm() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = TriggerScheduler::new(false, Duration::from_millis(10), tx);
        assert!(!scheduler.schedule(Duration::from_millis(10)));
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn test_schedule_without_runtime_degrades() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = TriggerScheduler::new(true, Duration::from_millis(10), tx);
        assert!(!scheduler.schedule(Duration::from_millis(10)));
    }
}
