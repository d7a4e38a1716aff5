//! Vendor reset countdowns and refresh scheduling.
//!
//! Two timing concerns live here. `countdown` classifies the time
//! remaining until a vendor restock for display. `ResetScheduler` runs
//! on the main tick and decides when a detected restock warrants a
//! silent forced snapshot refresh, rate-limited by a single global
//! debounce timestamp because the upstream source needs time to
//! publish post-reset data. `Debouncer` coalesces bursts of UI input
//! into one deferred evaluation.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::types::{Countdown, TraderResetTable, Urgency};

// ---------------------------------------------------------------------------
// Countdown classification
// ---------------------------------------------------------------------------

/// Label shown when a vendor has no known reset timestamp.
const UNKNOWN_LABEL: &str = "Unknown";
/// Label shown while a restock is in progress.
const RESET_LABEL: &str = "Resetting...";

/// Classify the time remaining until a vendor reset.
///
/// A reset in the past reads as "in progress" (CRITICAL), not as an
/// error. Under an hour the label switches to minutes+seconds, and the
/// final ten minutes escalate to WARNING.
pub fn countdown(reset_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Countdown {
    let Some(reset) = reset_time else {
        return Countdown {
            label: UNKNOWN_LABEL.to_string(),
            urgency: Urgency::Unknown,
        };
    };

    let remaining = (reset - now).num_seconds();
    if remaining <= 0 {
        return Countdown {
            label: RESET_LABEL.to_string(),
            urgency: Urgency::Critical,
        };
    }

    let hours = remaining / 3600;
    let minutes = (remaining / 60) % 60;
    let seconds = remaining % 60;

    if hours > 0 {
        Countdown {
            label: format!("{hours}h {minutes:02}m"),
            urgency: Urgency::Normal,
        }
    } else {
        let urgency = if minutes < 10 {
            Urgency::Warning
        } else {
            Urgency::Normal
        };
        Countdown {
            label: format!("{minutes}m {seconds:02}s"),
            urgency,
        }
    }
}

// ---------------------------------------------------------------------------
// Reset-driven refresh
// ---------------------------------------------------------------------------

/// Watches the trader reset table each tick and requests one silent
/// forced refresh per restock window.
///
/// The debounce timestamp is global across all vendors: several
/// traders resetting together must still produce a single refresh.
pub struct ResetScheduler {
    debounce: chrono::Duration,
    last_forced_refresh: Option<DateTime<Utc>>,
}

impl ResetScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce: chrono::Duration::from_std(debounce)
                .unwrap_or_else(|_| chrono::Duration::seconds(60)),
            last_forced_refresh: None,
        }
    }

    /// Returns true when the caller should perform a silent forced
    /// refresh now. Consumes the debounce window when it does.
    pub fn tick(&mut self, reset_table: &TraderResetTable, now: DateTime<Utc>) -> bool {
        let critical = reset_table
            .iter()
            .find(|(_, reset)| **reset <= now)
            .map(|(name, _)| name.clone());

        let Some(trader) = critical else {
            return false;
        };

        if let Some(last) = self.last_forced_refresh {
            if now - last < self.debounce {
                debug!(%trader, "Restock detected within debounce window, skipping refresh");
                return false;
            }
        }

        info!(%trader, "Restock detected, requesting silent refresh");
        self.last_forced_refresh = Some(now);
        true
    }
}

// ---------------------------------------------------------------------------
// Input debouncing
// ---------------------------------------------------------------------------

/// Defers a task until input has been quiet for a fixed delay.
///
/// Each call to [`Debouncer::schedule`] aborts the previously pending
/// task, so only the last burst survivor runs.
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Schedule `task` to run after the quiet delay, replacing any
    /// task still waiting.
    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    /// Drop any pending task without running it.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn at(secs_from_now: i64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        Some(now + chrono::Duration::seconds(secs_from_now))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap()
    }

    // ---- countdown ---------------------------------------------------------

    #[test]
    fn test_countdown_unknown_without_timestamp() {
        let c = countdown(None, now());
        assert_eq!(c.urgency, Urgency::Unknown);
        assert_eq!(c.label, "Unknown");
    }

    #[test]
    fn test_countdown_past_is_critical() {
        let c = countdown(at(-5, now()), now());
        assert_eq!(c.urgency, Urgency::Critical);
        assert_eq!(c.label, "Resetting...");
    }

    #[test]
    fn test_countdown_final_minutes_warn() {
        let c = countdown(at(8 * 60, now()), now());
        assert_eq!(c.urgency, Urgency::Warning);
        assert_eq!(c.label, "8m 00s");
    }

    #[test]
    fn test_countdown_sub_hour_normal_with_seconds() {
        let c = countdown(at(45 * 60 + 7, now()), now());
        assert_eq!(c.urgency, Urgency::Normal);
        assert_eq!(c.label, "45m 07s");
    }

    #[test]
    fn test_countdown_hours_normal_zero_padded_minutes() {
        let c = countdown(at(3 * 3600 + 5 * 60, now()), now());
        assert_eq!(c.urgency, Urgency::Normal);
        assert_eq!(c.label, "3h 05m");
    }

    // ---- reset scheduler ---------------------------------------------------

    fn table_with_reset(at: DateTime<Utc>) -> TraderResetTable {
        let mut table = TraderResetTable::new();
        table.insert("prapor".to_string(), at);
        table
    }

    #[test]
    fn test_tick_requests_refresh_on_elapsed_reset() {
        let mut scheduler = ResetScheduler::new(Duration::from_secs(60));
        let t0 = now();
        let table = table_with_reset(t0 - chrono::Duration::seconds(5));
        assert!(scheduler.tick(&table, t0));
    }

    #[test]
    fn test_tick_no_refresh_before_reset() {
        let mut scheduler = ResetScheduler::new(Duration::from_secs(60));
        let t0 = now();
        let table = table_with_reset(t0 + chrono::Duration::minutes(30));
        assert!(!scheduler.tick(&table, t0));
    }

    #[test]
    fn test_tick_debounces_repeat_detections() {
        // Two detections inside the window fire exactly one refresh.
        let mut scheduler = ResetScheduler::new(Duration::from_secs(60));
        let t0 = now();
        let table = table_with_reset(t0 - chrono::Duration::seconds(1));

        assert!(scheduler.tick(&table, t0));
        assert!(!scheduler.tick(&table, t0 + chrono::Duration::seconds(30)));
        assert!(scheduler.tick(&table, t0 + chrono::Duration::seconds(61)));
    }

    #[test]
    fn test_tick_debounce_is_global_across_traders() {
        let mut scheduler = ResetScheduler::new(Duration::from_secs(60));
        let t0 = now();
        let mut table = table_with_reset(t0 - chrono::Duration::seconds(1));
        table.insert("skier".to_string(), t0 - chrono::Duration::seconds(2));

        assert!(scheduler.tick(&table, t0));
        assert!(!scheduler.tick(&table, t0 + chrono::Duration::seconds(10)));
    }

    // ---- debouncer ---------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_runs_only_last_scheduled() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            debouncer.schedule(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_cancel_drops_pending() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        let c = Arc::clone(&counter);
        debouncer.schedule(async move {
            c.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
