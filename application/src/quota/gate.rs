//! Per-model admission gate
//!
//! A [`QuotaGate`] caps the requests and tokens a model may use in fixed
//! windows measured from the gate's creation. Callers reserve an estimated
//! token count through [`QuotaGate::acquire`] and settle the reservation
//! through the returned [`QuotaPermit`]. Blocked callers are admitted in
//! arrival order.

use forecast_domain::{Model, QuotaConfig};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

/// Errors raised by the quota gate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuotaError {
    #[error("Quota timeout: {model} did not admit the call within {waited:?}")]
    Timeout { model: String, waited: Duration },

    #[error("Quota exceeded: {requested} estimated tokens exceed {model}'s window of {capacity}")]
    ExceedsCapacity {
        model: String,
        requested: u64,
        capacity: u64,
    },
}

impl QuotaError {
    /// Short tag recorded as the cause of a tolerated failure
    pub fn cause_name(&self) -> &'static str {
        match self {
            QuotaError::Timeout { .. } => "QuotaTimeout",
            QuotaError::ExceedsCapacity { .. } => "QuotaExceedsCapacity",
        }
    }
}

/// Point-in-time view of a gate's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub requests_in_window: u64,
    pub tokens_consumed: u64,
    pub tokens_reserved: u64,
    pub waiting: usize,
}

struct QuotaState {
    request_window: u64,
    requests: u64,
    token_window: u64,
    tokens_consumed: u64,
    tokens_reserved: u64,
    queue: VecDeque<u64>,
    next_ticket: u64,
}

impl QuotaState {
    fn new() -> Self {
        Self {
            request_window: 0,
            requests: 0,
            token_window: 0,
            tokens_consumed: 0,
            tokens_reserved: 0,
            queue: VecDeque::new(),
            next_ticket: 0,
        }
    }
}

struct GateInner {
    model: Model,
    config: QuotaConfig,
    epoch: Instant,
    state: Mutex<QuotaState>,
    notify: Notify,
}

fn window_index(epoch: Instant, now: Instant, period: Duration) -> u64 {
    let elapsed = now.saturating_duration_since(epoch).as_nanos();
    let period = period.as_nanos().max(1);
    (elapsed / period) as u64
}

fn window_end(epoch: Instant, index: u64, period: Duration) -> Instant {
    let nanos = period.as_nanos().saturating_mul(u128::from(index) + 1);
    epoch + Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

impl GateInner {
    fn lock(&self) -> MutexGuard<'_, QuotaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset counters whose window has ended.
    fn roll(&self, state: &mut QuotaState, now: Instant) {
        let request_window = window_index(self.epoch, now, self.config.request_period);
        if request_window != state.request_window {
            state.request_window = request_window;
            state.requests = 0;
        }
        let token_window = window_index(self.epoch, now, self.config.token_period);
        if token_window != state.token_window {
            state.token_window = token_window;
            state.tokens_consumed = 0;
            state.tokens_reserved = 0;
        }
    }

    /// Try to admit the head of the queue.
    ///
    /// Returns the permit's token window on admission, otherwise the
    /// instant at which the blocking limit resets.
    fn try_admit(
        &self,
        state: &mut QuotaState,
        ticket: u64,
        estimated: u64,
        now: Instant,
    ) -> Result<u64, Option<Instant>> {
        self.roll(state, now);
        if state.queue.front() != Some(&ticket) {
            return Err(None);
        }

        let requests_full = state.requests >= self.config.requests_per_period;
        let tokens_full = state.tokens_consumed + state.tokens_reserved + estimated
            > self.config.tokens_per_period;

        if !requests_full && !tokens_full {
            state.queue.pop_front();
            state.requests += 1;
            state.tokens_reserved += estimated;
            return Ok(state.token_window);
        }

        let request_reset = requests_full.then(|| {
            window_end(self.epoch, state.request_window, self.config.request_period)
        });
        let token_reset = tokens_full
            .then(|| window_end(self.epoch, state.token_window, self.config.token_period));
        Err(match (request_reset, token_reset) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        })
    }

    fn settle(&self, token_window: u64, estimated: u64, actual: Option<u64>) {
        {
            let mut state = self.lock();
            self.roll(&mut state, Instant::now());
            // A reservation from an ended window was already cleared by the reset.
            if state.token_window == token_window {
                state.tokens_reserved = state.tokens_reserved.saturating_sub(estimated);
                state.tokens_consumed += actual.unwrap_or(estimated);
            }
        }
        self.notify.notify_waiters();
    }
}

/// Rate gate for a single model identity
///
/// Cloning yields another handle to the same gate.
#[derive(Clone)]
pub struct QuotaGate {
    inner: Arc<GateInner>,
}

impl QuotaGate {
    pub fn new(model: Model, config: QuotaConfig) -> Self {
        Self {
            inner: Arc::new(GateInner {
                model,
                config,
                epoch: Instant::now(),
                state: Mutex::new(QuotaState::new()),
                notify: Notify::new(),
            }),
        }
    }

    pub fn model(&self) -> &Model {
        &self.inner.model
    }

    pub fn config(&self) -> &QuotaConfig {
        &self.inner.config
    }

    /// Whether both handles refer to the same gate
    pub fn same_gate(&self, other: &QuotaGate) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Wait for admission of one request with `estimated_tokens`.
    ///
    /// Fails immediately when the estimate alone exceeds the token window,
    /// and with [`QuotaError::Timeout`] when admission takes longer than the
    /// configured timeout. A timed-out caller consumes nothing.
    pub async fn acquire(&self, estimated_tokens: u64) -> Result<QuotaPermit, QuotaError> {
        let config = self.inner.config;
        if estimated_tokens > config.tokens_per_period {
            return Err(QuotaError::ExceedsCapacity {
                model: self.inner.model.to_string(),
                requested: estimated_tokens,
                capacity: config.tokens_per_period,
            });
        }

        let ticket = {
            let mut state = self.inner.lock();
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            state.queue.push_back(ticket);
            ticket
        };
        let _guard = TicketGuard {
            inner: &self.inner,
            ticket,
        };

        match tokio::time::timeout(config.timeout, self.wait_turn(ticket, estimated_tokens)).await
        {
            Ok(token_window) => Ok(QuotaPermit {
                gate: Arc::clone(&self.inner),
                token_window,
                estimated: estimated_tokens,
                settled: false,
            }),
            Err(_) => {
                warn!(
                    "Quota timeout for {} after {:?} ({} tokens requested)",
                    self.inner.model, config.timeout, estimated_tokens
                );
                Err(QuotaError::Timeout {
                    model: self.inner.model.to_string(),
                    waited: config.timeout,
                })
            }
        }
    }

    async fn wait_turn(&self, ticket: u64, estimated: u64) -> u64 {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let outcome = {
                let mut state = self.inner.lock();
                self.inner
                    .try_admit(&mut state, ticket, estimated, Instant::now())
            };

            match outcome {
                Ok(token_window) => {
                    debug!(
                        "Admitted call to {} ({} tokens reserved)",
                        self.inner.model, estimated
                    );
                    // The next caller in line may fit as well.
                    self.inner.notify.notify_waiters();
                    return token_window;
                }
                Err(Some(reset_at)) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = tokio::time::sleep_until(reset_at) => {}
                    }
                }
                Err(None) => notified.await,
            }
        }
    }

    pub fn snapshot(&self) -> QuotaSnapshot {
        let mut state = self.inner.lock();
        self.inner.roll(&mut state, Instant::now());
        QuotaSnapshot {
            requests_in_window: state.requests,
            tokens_consumed: state.tokens_consumed,
            tokens_reserved: state.tokens_reserved,
            waiting: state.queue.len(),
        }
    }
}

impl std::fmt::Debug for QuotaGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaGate")
            .field("model", &self.inner.model)
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Removes a ticket from the queue when its caller stops waiting.
struct TicketGuard<'a> {
    inner: &'a GateInner,
    ticket: u64,
}

impl Drop for TicketGuard<'_> {
    fn drop(&mut self) {
        let removed = {
            let mut state = self.inner.lock();
            let before = state.queue.len();
            state.queue.retain(|t| *t != self.ticket);
            state.queue.len() != before
        };
        if removed {
            self.inner.notify.notify_waiters();
        }
    }
}

/// Admission for one call
///
/// Settle it with [`QuotaPermit::complete`] once the actual token usage is
/// known. Dropping an unsettled permit charges the estimate.
#[must_use = "dropping a permit immediately charges its estimate"]
pub struct QuotaPermit {
    gate: Arc<GateInner>,
    token_window: u64,
    estimated: u64,
    settled: bool,
}

impl QuotaPermit {
    pub fn estimated_tokens(&self) -> u64 {
        self.estimated
    }

    /// Replace the reservation with the actual usage, when reported.
    pub fn complete(mut self, actual_tokens: Option<u64>) {
        self.settled = true;
        self.gate
            .settle(self.token_window, self.estimated, actual_tokens);
    }
}

impl Drop for QuotaPermit {
    fn drop(&mut self) {
        if !self.settled {
            self.gate.settle(self.token_window, self.estimated, None);
        }
    }
}

impl std::fmt::Debug for QuotaPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaPermit")
            .field("model", &self.gate.model)
            .field("estimated", &self.estimated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn quota(requests: u64, tokens: u64, period_secs: u64, timeout_secs: u64) -> QuotaConfig {
        QuotaConfig::new(
            requests,
            tokens,
            Duration::from_secs(period_secs),
            Duration::from_secs(timeout_secs),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_cap_blocks_until_next_window() {
        let gate = QuotaGate::new(Model::O3Mini, quota(2, 1_000_000, 10, 60));
        let start = Instant::now();

        gate.acquire(10).await.unwrap().complete(Some(10));
        gate.acquire(10).await.unwrap().complete(Some(10));
        assert_eq!(gate.snapshot().requests_in_window, 2);

        gate.acquire(10).await.unwrap().complete(Some(10));
        assert!(start.elapsed() >= Duration::from_secs(10));
        assert_eq!(gate.snapshot().requests_in_window, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_cap_blocks_until_next_window() {
        let gate = QuotaGate::new(Model::O3Mini, quota(100, 1_000, 10, 60));
        let start = Instant::now();

        gate.acquire(600).await.unwrap().complete(Some(600));
        gate.acquire(600).await.unwrap().complete(Some(600));

        assert!(start.elapsed() >= Duration::from_secs(10));
        assert_eq!(gate.snapshot().tokens_consumed, 600);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settling_below_estimate_frees_tokens_in_same_window() {
        let gate = QuotaGate::new(Model::O3Mini, quota(100, 1_000, 10, 60));
        let start = Instant::now();

        let first = gate.acquire(600).await.unwrap();
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.acquire(600).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(gate.snapshot().waiting, 1);

        first.complete(Some(100));
        let second = waiter.await.unwrap().unwrap();

        assert!(start.elapsed() < Duration::from_secs(10));
        let snapshot = gate.snapshot();
        assert_eq!(snapshot.tokens_consumed, 100);
        assert_eq!(snapshot.tokens_reserved, 600);
        drop(second);
        assert_eq!(gate.snapshot().tokens_consumed, 700);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_leaves_no_trace() {
        let gate = QuotaGate::new(Model::O3Mini, quota(1, 1_000, 60, 5));
        let held = gate.acquire(10).await.unwrap();
        let start = Instant::now();

        let err = gate.acquire(10).await.unwrap_err();

        assert!(matches!(err, QuotaError::Timeout { .. }));
        assert_eq!(err.cause_name(), "QuotaTimeout");
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(60));
        let snapshot = gate.snapshot();
        assert_eq!(snapshot.waiting, 0);
        assert_eq!(snapshot.requests_in_window, 1);
        drop(held);
    }

    #[tokio::test(start_paused = true)]
    async fn test_estimate_above_capacity_fails_immediately() {
        let gate = QuotaGate::new(Model::Gpt4o, quota(10, 1_000, 10, 60));
        let err = gate.acquire(1_001).await.unwrap_err();
        assert_eq!(
            err,
            QuotaError::ExceedsCapacity {
                model: "gpt-4o".to_string(),
                requested: 1_001,
                capacity: 1_000,
            }
        );
        assert_eq!(gate.snapshot().requests_in_window, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_callers_admitted_in_arrival_order() {
        let gate = QuotaGate::new(Model::O3Mini, quota(1, 1_000_000, 10, 100));
        gate.acquire(1).await.unwrap().complete(None);

        let order = Arc::new(StdMutex::new(Vec::new()));
        let mut handles = Vec::new();
        for name in ["a", "b", "c"] {
            let gate = gate.clone();
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let permit = gate.acquire(1).await.unwrap();
                order.lock().unwrap().push(name);
                permit.complete(Some(1));
            }));
            tokio::task::yield_now().await;
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counters_reset_at_window_boundary() {
        let gate = QuotaGate::new(Model::O3Mini, quota(5, 1_000, 10, 60));
        gate.acquire(300).await.unwrap().complete(Some(250));
        let held = gate.acquire(100).await.unwrap();

        let snapshot = gate.snapshot();
        assert_eq!(snapshot.requests_in_window, 2);
        assert_eq!(snapshot.tokens_consumed, 250);
        assert_eq!(snapshot.tokens_reserved, 100);

        tokio::time::advance(Duration::from_secs(11)).await;
        // Settled after the boundary: the old reservation is not charged.
        held.complete(Some(100));

        let snapshot = gate.snapshot();
        assert_eq!(snapshot.requests_in_window, 0);
        assert_eq!(snapshot.tokens_consumed, 0);
        assert_eq!(snapshot.tokens_reserved, 0);
    }
}
