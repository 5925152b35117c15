//! Heartbeat scheduling for lobbylink connections.
//!
//! The lobby protocol disconnects idle clients, so the engine must send a
//! keepalive whenever the connection has been quiet for too long. The rule
//! is: *every* outbound send re-arms the timer — a busy connection never
//! pings, a quiet one pings exactly once per interval. The scheduler also
//! times the ping/acknowledgment round trip as a latency measurement.
//!
//! # Integration
//!
//! [`KeepaliveScheduler::wait`] is designed to sit in the connection
//! actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(op) = op_rx.recv() => { /* send — calls scheduler.reset() */ }
//!         chunk = transport.recv() => { /* dispatch lines */ }
//!         _ = scheduler.wait() => {
//!             // quiet too long: send PING (which itself resets the timer)
//!         }
//!     }
//! }
//! ```
//!
//! While disarmed (before connect, after disconnect) `wait` pends forever,
//! so the other branches keep running.

use std::time::{Duration, Instant};

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace};

/// Configuration for the heartbeat.
#[derive(Debug, Clone)]
pub struct KeepaliveConfig {
    /// Quiet time after the last outbound send before a heartbeat fires.
    /// The default matches the idle window lobby servers recommend.
    pub interval: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

impl KeepaliveConfig {
    /// Config with a specific interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }
}

/// Cancellable heartbeat timer plus round-trip bookkeeping.
///
/// At most one deadline is ever armed: [`reset`](Self::reset) replaces the
/// previous one, it never stacks. One scheduler per connection.
pub struct KeepaliveScheduler {
    config: KeepaliveConfig,
    /// When the next heartbeat fires. `None` while disarmed.
    deadline: Option<TokioInstant>,
    /// When the last ping left, awaiting its acknowledgment.
    ping_sent: Option<Instant>,
    /// Latest measured round trip.
    last_rtt: Option<Duration>,
    /// Heartbeats fired so far (for logs and tests).
    pings_fired: u64,
}

impl KeepaliveScheduler {
    /// Creates a disarmed scheduler. Call [`reset`](Self::reset) once the
    /// connection is up.
    pub fn new(config: KeepaliveConfig) -> Self {
        debug!(interval_s = config.interval.as_secs_f64(), "keepalive scheduler created");
        Self {
            config,
            deadline: None,
            ping_sent: None,
            last_rtt: None,
            pings_fired: 0,
        }
    }

    /// Cancels the pending heartbeat (if any) and schedules a new one a
    /// full interval from now. Called on every outbound send — including
    /// the heartbeat send itself.
    pub fn reset(&mut self) {
        self.deadline = Some(TokioInstant::now() + self.config.interval);
    }

    /// Disarms the timer and forgets any outstanding ping. Called on
    /// disconnect.
    pub fn disarm(&mut self) {
        self.deadline = None;
        self.ping_sent = None;
    }

    /// Resolves when the heartbeat is due. Pends forever while disarmed.
    pub async fn wait(&mut self) {
        let Some(deadline) = self.deadline else {
            std::future::pending::<()>().await;
            unreachable!()
        };
        time::sleep_until(deadline).await;
        self.pings_fired += 1;
        trace!(fired = self.pings_fired, "heartbeat due");
    }

    /// Marks the moment a ping left the engine. A previous unacknowledged
    /// ping is simply forgotten — there is no retry or escalation; a dead
    /// peer is only ever detected by the transport failing.
    pub fn record_ping(&mut self) {
        self.ping_sent = Some(Instant::now());
    }

    /// The ping's acknowledgment arrived: record the round trip.
    pub fn record_pong(&mut self) {
        if let Some(sent) = self.ping_sent.take() {
            let rtt = sent.elapsed();
            trace!(rtt_ms = rtt.as_secs_f64() * 1000.0, "heartbeat acknowledged");
            self.last_rtt = Some(rtt);
        }
    }

    /// Latest measured round trip, if any ping has been acknowledged.
    pub fn last_rtt(&self) -> Option<Duration> {
        self.last_rtt
    }

    /// `true` while a heartbeat deadline is armed.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Heartbeats fired since creation.
    pub fn pings_fired(&self) -> u64 {
        self.pings_fired
    }

    /// The configured quiet interval.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler_100ms() -> KeepaliveScheduler {
        KeepaliveScheduler::new(KeepaliveConfig::with_interval(Duration::from_millis(
            100,
        )))
    }

    #[test]
    fn test_new_scheduler_is_disarmed() {
        let s = scheduler_100ms();
        assert!(!s.is_armed());
        assert_eq!(s.pings_fired(), 0);
        assert_eq!(s.last_rtt(), None);
    }

    #[test]
    fn test_default_interval_is_thirty_seconds() {
        assert_eq!(KeepaliveConfig::default().interval, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_fires_after_interval() {
        let mut s = scheduler_100ms();
        s.reset();
        assert!(s.is_armed());

        s.wait().await;
        assert_eq!(s.pings_fired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_pushes_deadline_back() {
        let mut s = scheduler_100ms();
        s.reset();

        // Half the interval passes, then another send resets the timer.
        time::advance(Duration::from_millis(50)).await;
        s.reset();

        // 60 ms later the original deadline has long passed but the new
        // one has not — the heartbeat must not have fired.
        let fired = tokio::select! {
            _ = s.wait() => true,
            _ = time::sleep(Duration::from_millis(60)) => false,
        };
        assert!(!fired, "reset must cancel the earlier deadline");
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_one_deadline_pending() {
        let mut s = scheduler_100ms();
        // Many resets in a row arm exactly one deadline.
        for _ in 0..10 {
            s.reset();
        }
        s.wait().await;
        assert_eq!(s.pings_fired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_pends_forever_while_disarmed() {
        let mut s = scheduler_100ms();
        let fired = tokio::select! {
            _ = s.wait() => true,
            _ = time::sleep(Duration::from_secs(3600)) => false,
        };
        assert!(!fired, "disarmed scheduler must never fire");
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_cancels_pending_heartbeat() {
        let mut s = scheduler_100ms();
        s.reset();
        s.disarm();
        assert!(!s.is_armed());

        let fired = tokio::select! {
            _ = s.wait() => true,
            _ = time::sleep(Duration::from_secs(1)) => false,
        };
        assert!(!fired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rtt_measured_between_ping_and_pong() {
        let mut s = scheduler_100ms();
        s.record_ping();
        time::advance(Duration::from_millis(40)).await;
        s.record_pong();

        // The round trip is measured on the std clock, which paused tokio
        // time does not control; assert the measurement exists and is
        // sane rather than exact.
        let rtt = s.last_rtt().expect("rtt must be recorded");
        assert!(rtt <= Duration::from_secs(1));
    }

    #[test]
    fn test_pong_without_ping_is_ignored() {
        let mut s = scheduler_100ms();
        s.record_pong();
        assert_eq!(s.last_rtt(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_ack_does_not_block_next_heartbeat() {
        let mut s = scheduler_100ms();
        s.reset();
        s.wait().await;
        s.record_ping();
        // No pong ever arrives; the next send still re-arms the timer and
        // the next heartbeat still fires.
        s.reset();
        s.wait().await;
        assert_eq!(s.pings_fired(), 2);
        assert_eq!(s.last_rtt(), None);
    }
}
