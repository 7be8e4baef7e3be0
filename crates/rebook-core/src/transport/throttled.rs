use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{ports::SmsTransport, Result};

/// How often idle per-phone limiters are swept out.
const PRUNE_EVERY: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* two sends.
    pub global_min_interval: Duration,
    /// Minimum spacing between sends to the same phone.
    pub per_phone_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40),      // ~25/sec
            per_phone_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// A limiter whose next slot has already passed holds no state worth
    /// keeping: a fresh one would behave the same.
    fn is_idle(&self, now: Instant) -> bool {
        self.next <= now
    }

    /// Reserve the next slot and return the wait required before sending.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// SmsTransport decorator that spaces outbound sends.
///
/// Best-effort protection against carrier rate limits when a worker run
/// flushes many due reminders at once.
pub struct ThrottledSms {
    inner: Arc<dyn SmsTransport>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_phone: Mutex<PhoneLimiters>,
}

/// Per-phone limiters, swept of idle entries at most every [`PRUNE_EVERY`].
struct PhoneLimiters {
    by_phone: HashMap<String, Arc<Mutex<IntervalLimiter>>>,
    next_prune: Instant,
}

impl PhoneLimiters {
    fn new() -> Self {
        Self {
            by_phone: HashMap::new(),
            next_prune: Instant::now() + PRUNE_EVERY,
        }
    }

    fn prune_idle(&mut self, now: Instant) {
        if now < self.next_prune {
            return;
        }
        let before = self.by_phone.len();
        // A limiter still shared with a caller or locked is in use.
        self.by_phone.retain(|_, lim| {
            Arc::strong_count(lim) > 1 || lim.try_lock().map_or(true, |l| !l.is_idle(now))
        });
        self.next_prune = now + PRUNE_EVERY;

        let dropped = before - self.by_phone.len();
        if dropped > 0 {
            tracing::debug!(dropped, kept = self.by_phone.len(), "pruned idle sms limiters");
        }
    }
}

impl ThrottledSms {
    pub fn new(inner: Arc<dyn SmsTransport>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_phone: Mutex::new(PhoneLimiters::new()),
        }
    }

    async fn limiter_for_phone(&self, phone: &str) -> Arc<Mutex<IntervalLimiter>> {
        let mut limiters = self.per_phone.lock().await;
        limiters.prune_idle(Instant::now());
        limiters
            .by_phone
            .entry(phone.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_phone_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle(&self, phone: &str) {
        let global_wait = { self.global.lock().await.reserve() };
        let phone_wait = {
            let lim = self.limiter_for_phone(phone).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(phone_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl SmsTransport for ThrottledSms {
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<()> {
        self.throttle(to).await;
        self.inner.send(from, to, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingSms {
        sends: StdMutex<Vec<(String, Instant)>>,
    }

    #[async_trait::async_trait]
    impl SmsTransport for RecordingSms {
        async fn send(&self, _from: &str, to: &str, _body: &str) -> Result<()> {
            self.sends
                .lock()
                .unwrap()
                .push((to.to_string(), Instant::now()));
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spaces_sends_to_the_same_phone() {
        let inner = Arc::new(RecordingSms::default());
        let sms = ThrottledSms::new(
            inner.clone(),
            ThrottleConfig {
                global_min_interval: Duration::from_millis(10),
                per_phone_min_interval: Duration::from_millis(500),
            },
        );

        sms.send("+1000", "+1555", "a").await.unwrap();
        sms.send("+1000", "+1555", "b").await.unwrap();
        sms.send("+1000", "+1666", "c").await.unwrap();

        let sends = inner.sends.lock().unwrap().clone();
        assert_eq!(sends.len(), 3);
        let same_phone_gap = sends[1].1 - sends[0].1;
        assert!(same_phone_gap >= Duration::from_millis(500), "{same_phone_gap:?}");
        // A different phone only waits for the global slot.
        let other_gap = sends[2].1 - sends[1].1;
        assert!(other_gap < Duration::from_millis(500), "{other_gap:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn idle_phones_are_forgotten() {
        let sms = ThrottledSms::new(
            Arc::new(RecordingSms::default()),
            ThrottleConfig {
                global_min_interval: Duration::ZERO,
                per_phone_min_interval: Duration::from_millis(500),
            },
        );

        for i in 0..5000 {
            sms.send("+1000", &format!("+1555{i:07}"), "hi").await.unwrap();
        }
        assert_eq!(sms.per_phone.lock().await.by_phone.len(), 5000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        sms.send("+1000", "+15558888888", "hi").await.unwrap();

        let limiters = sms.per_phone.lock().await;
        assert_eq!(limiters.by_phone.len(), 1);
        assert!(limiters.by_phone.contains_key("+15558888888"));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_keeps_limiters_with_a_pending_slot() {
        let mut busy = IntervalLimiter::new(Duration::from_secs(600));
        busy.reserve();
        let idle = IntervalLimiter::new(Duration::from_secs(1));

        let mut limiters = PhoneLimiters::new();
        limiters
            .by_phone
            .insert("+1555".to_string(), Arc::new(Mutex::new(busy)));
        limiters
            .by_phone
            .insert("+1666".to_string(), Arc::new(Mutex::new(idle)));

        limiters.prune_idle(Instant::now() + PRUNE_EVERY);
        let kept: Vec<_> = limiters.by_phone.keys().cloned().collect();
        assert_eq!(kept, vec!["+1555".to_string()]);
    }
}
