use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

use crate::error::{CorrelatorError, Result};

/// Tuning for a count-based circuit breaker.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerConfig {
    /// Outcomes kept in the sliding window.
    pub window_size: usize,
    /// Outcomes required before the failure rate is evaluated.
    pub minimum_calls: usize,
    /// Failure percentage (0-100) at which the circuit opens.
    pub failure_rate_threshold: f64,
    /// Time spent open before trial calls are let through.
    pub open_wait: Duration,
    /// Trial calls permitted while half-open.
    pub half_open_calls: usize,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            minimum_calls: 100,
            failure_rate_threshold: 50.0,
            open_wait: Duration::from_secs(60),
            half_open_calls: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    /// `true` marks a failure
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    /// Trial permits handed out since entering half-open
    half_open_permits: usize,
}

/// Circuit breaker guarding one upstream host.
///
/// Not-found outcomes are ignored: they neither count as failures nor as
/// successes.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Window and half-open sizes below one are raised to one.
    pub fn new(name: impl Into<String>, mut config: BreakerConfig) -> Self {
        config.window_size = config.window_size.max(1);
        config.half_open_calls = config.half_open_calls.max(1);

        Self {
            name: name.into(),
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                window: VecDeque::with_capacity(config.window_size),
                opened_at: None,
                half_open_permits: 0,
            }),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    /// Failures currently recorded in the window.
    pub fn failure_count(&self) -> usize {
        self.lock().window.iter().filter(|failed| **failed).count()
    }

    /// Outcomes currently recorded in the window.
    pub fn buffered_calls(&self) -> usize {
        self.lock().window.len()
    }

    /// Asks for permission to make a call.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelatorError::CircuitOpen`] while the circuit is open or
    /// the half-open trial budget is spent.
    pub fn try_acquire(&self) -> Result<()> {
        let mut inner = self.lock();

        if inner.state == BreakerState::Open {
            let waited = inner
                .opened_at
                .is_some_and(|at| at.elapsed() >= self.config.open_wait);
            if !waited {
                return Err(self.open_error());
            }
            debug!("Circuit breaker '{}' half-open", self.name);
            inner.state = BreakerState::HalfOpen;
            inner.window.clear();
            inner.half_open_permits = 0;
        }

        if inner.state == BreakerState::HalfOpen {
            if inner.half_open_permits >= self.config.half_open_calls {
                return Err(self.open_error());
            }
            inner.half_open_permits += 1;
        }

        Ok(())
    }

    pub fn on_success(&self) {
        self.record(false);
    }

    pub fn on_failure(&self) {
        self.record(true);
    }

    /// Releases a permit without recording an outcome.
    pub fn on_ignored(&self) {
        let mut inner = self.lock();
        if inner.state == BreakerState::HalfOpen {
            inner.half_open_permits = inner.half_open_permits.saturating_sub(1);
        }
    }

    /// Runs `op` under the breaker, classifying its outcome.
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.try_acquire()?;
        let permit = Permit {
            breaker: self,
            settled: false,
        };

        let result = op().await;
        permit.settle(&result);
        result
    }

    fn record(&self, failed: bool) {
        let mut inner = self.lock();

        match inner.state {
            // calls that were in flight when the circuit opened
            BreakerState::Open => {}
            BreakerState::Closed => {
                if inner.window.len() == self.config.window_size {
                    inner.window.pop_front();
                }
                inner.window.push_back(failed);

                if inner.window.len() >= self.config.minimum_calls.max(1)
                    && failure_rate(&inner.window) >= self.config.failure_rate_threshold
                {
                    self.open(&mut inner);
                }
            }
            BreakerState::HalfOpen => {
                inner.window.push_back(failed);
                if inner.window.len() >= self.config.half_open_calls {
                    if failure_rate(&inner.window) >= self.config.failure_rate_threshold {
                        self.open(&mut inner);
                    } else {
                        debug!("Circuit breaker '{}' closed", self.name);
                        inner.state = BreakerState::Closed;
                        inner.window.clear();
                    }
                }
            }
        }
    }

    fn open(&self, inner: &mut Inner) {
        warn!(
            "Circuit breaker '{}' opened after {:.1}% failures",
            self.name,
            failure_rate(&inner.window)
        );
        inner.state = BreakerState::Open;
        inner.opened_at = Some(Instant::now());
        inner.window.clear();
    }

    fn open_error(&self) -> CorrelatorError {
        CorrelatorError::CircuitOpen {
            name: self.name.clone(),
        }
    }
}

/// An acquired call slot. Dropped unsettled (the call was cancelled), it is
/// released without recording an outcome.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl Permit<'_> {
    fn settle<T>(mut self, result: &Result<T>) {
        self.settled = true;
        match result {
            Ok(_) => self.breaker.on_success(),
            Err(e) if e.is_not_found() => self.breaker.on_ignored(),
            Err(_) => self.breaker.on_failure(),
        }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!("Call through '{}' cancelled", self.breaker.name);
            self.breaker.on_ignored();
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn failure_rate(window: &VecDeque<bool>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let failures = window.iter().filter(|failed| **failed).count();
    failures as f64 * 100.0 / window.len() as f64
}

/// Breakers keyed by upstream host, owned by the correlator that uses them.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    config: BreakerConfig,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the breaker for `name`, creating it on first use.
    pub fn breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            breakers
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(CircuitBreaker::new(name, self.config.clone()))),
        )
    }
}
