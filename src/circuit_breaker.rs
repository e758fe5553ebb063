//! # Circuit Breaker Module
//!
//! Circuit breaker guarding calls to the Google APIs. After repeated failures
//! requests fail fast until the reset window elapses, so a broken store or
//! Drive outage does not stall every conversation on timeouts.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;

/// Circuit breaker for remote service calls
///
/// # State Machine
///
/// - **Closed**: Normal operation, requests pass through
/// - **Open**: Failure threshold exceeded, requests fail fast
/// - **Half-Open**: Reset window elapsed, the next request is let through
///
/// # Configuration
///
/// Uses `RecoveryConfig` for:
/// - `circuit_breaker_threshold`: Failures before opening (default: 5)
/// - `circuit_breaker_reset_secs`: Time before attempting reset (default: 60s)
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    failure_count: Mutex<u32>,
    last_failure_time: Mutex<Option<Instant>>,
    config: RecoveryConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker for the named service
    ///
    /// # Examples
    ///
    /// ```rust
    /// use debo::config::RecoveryConfig;
    /// use debo::circuit_breaker::CircuitBreaker;
    ///
    /// let breaker = CircuitBreaker::new("sheets", RecoveryConfig::default());
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(name: &'static str, config: RecoveryConfig) -> Self {
        Self {
            name,
            failure_count: Mutex::new(0),
            last_failure_time: Mutex::new(None),
            config,
        }
    }

    /// Check if circuit breaker is open (blocking requests)
    ///
    /// Returns `true` when failure count >= threshold and the reset window
    /// has not elapsed. Resets itself to closed once the window passes.
    pub fn is_open(&self) -> bool {
        let failure_count = *self.failure_count.lock().unwrap();
        let last_failure = *self.last_failure_time.lock().unwrap();

        if failure_count >= self.config.circuit_breaker_threshold {
            if let Some(last_time) = last_failure {
                if last_time.elapsed() < Duration::from_secs(self.config.circuit_breaker_reset_secs) {
                    return true;
                }
                tracing::info!(service = self.name, "Circuit breaker reset window elapsed, closing");
                *self.failure_count.lock().unwrap() = 0;
                *self.last_failure_time.lock().unwrap() = None;
            }
        }
        false
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let mut count = self.failure_count.lock().unwrap();
        *count += 1;
        *self.last_failure_time.lock().unwrap() = Some(Instant::now());

        if *count == self.config.circuit_breaker_threshold {
            tracing::warn!(
                service = self.name,
                failures = *count,
                "Circuit breaker opened after repeated failures"
            );
        }
    }

    /// Record a successful call, closing the circuit
    pub fn record_success(&self) {
        *self.failure_count.lock().unwrap() = 0;
        *self.last_failure_time.lock().unwrap() = None;
    }
}
