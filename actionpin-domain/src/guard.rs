//! Retry, throttle and abort handling around every remote call.

use crate::ports::RemoteError;
use actionpin_types::ValidationResult;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, warn};

const MAX_THROTTLE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay for transport retries; doubles per attempt.
    pub retry_delay: Duration,
    /// Base delay after a rate-limit response; doubles per hit.
    pub rate_limit_delay: Duration,
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            rate_limit_delay: Duration::from_secs(2),
        }
    }
}

impl NetworkPolicy {
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        self.retry_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_THROTTLE)
    }

    fn rate_limit_backoff(&self, hits: u32) -> Duration {
        self.rate_limit_delay
            .saturating_mul(2u32.saturating_pow(hits.saturating_sub(1)))
            .min(MAX_THROTTLE)
    }
}

/// A run-level failure. Replaces per-line results for the whole run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunAbort {
    #[error("network connectivity issue while {operation} (gave up after {attempts} attempts): {message}")]
    Connectivity {
        operation: String,
        attempts: u32,
        message: String,
    },

    #[error("timed out while {operation} (gave up after {attempts} attempts): {message}")]
    Timeout {
        operation: String,
        attempts: u32,
        message: String,
    },

    #[error("authentication failed while {operation}: {message}")]
    Authentication { operation: String, message: String },

    #[error("rate limit exceeded while {operation} (gave up after {attempts} attempts): {message}")]
    RateLimited {
        operation: String,
        attempts: u32,
        message: String,
    },

    #[error("run cancelled before {operation}")]
    Cancelled { operation: String },
}

impl RunAbort {
    pub fn result(&self) -> ValidationResult {
        match self {
            RunAbort::Connectivity { .. } | RunAbort::Cancelled { .. } => {
                ValidationResult::NetworkError
            }
            RunAbort::Timeout { .. } => ValidationResult::ValidationTimeout,
            RunAbort::Authentication { .. } => ValidationResult::AuthenticationError,
            RunAbort::RateLimited { .. } => ValidationResult::RateLimited,
        }
    }

    pub fn remediation(&self) -> &'static str {
        match self {
            RunAbort::Connectivity { .. } | RunAbort::Cancelled { .. } => {
                "Check network connectivity (DNS, proxy, firewall) and re-run. No references were judged invalid."
            }
            RunAbort::Timeout { .. } => {
                "The remote did not answer in time. Raise network.timeout_seconds or re-run later."
            }
            RunAbort::Authentication { .. } => {
                "Check that GITHUB_TOKEN (or --github-token) is valid and has not expired."
            }
            RunAbort::RateLimited { .. } => {
                "Wait for the rate limit window to reset, or supply a token for a higher limit."
            }
        }
    }

    fn from_exhausted(operation: &str, attempts: u32, err: RemoteError) -> Self {
        let operation = operation.to_string();
        match err {
            RemoteError::Timeout(message) => RunAbort::Timeout {
                operation,
                attempts,
                message,
            },
            RemoteError::RateLimited { message, .. } => RunAbort::RateLimited {
                operation,
                attempts,
                message,
            },
            RemoteError::Authentication(message) => RunAbort::Authentication { operation, message },
            RemoteError::Transport(message) | RemoteError::NotFound(message) => {
                RunAbort::Connectivity {
                    operation,
                    attempts,
                    message,
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct Throttle {
    until: Option<Instant>,
    hits: u32,
}

/// Shared by every worker of a run.
///
/// The first abort is sticky: once stored, every later guarded call returns
/// it without touching the remote.
#[derive(Debug)]
pub struct NetworkGuard {
    policy: NetworkPolicy,
    throttle: Mutex<Throttle>,
    cancelled: AtomicBool,
    abort: Mutex<Option<RunAbort>>,
}

impl NetworkGuard {
    pub fn new(policy: NetworkPolicy) -> Self {
        Self {
            policy,
            throttle: Mutex::new(Throttle::default()),
            cancelled: AtomicBool::new(false),
            abort: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &NetworkPolicy {
        &self.policy
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn abort_reason(&self) -> Option<RunAbort> {
        if !self.is_cancelled() {
            return None;
        }
        self.abort.lock().clone()
    }

    /// Record an abort and cancel the run. Returns the abort that won.
    pub fn cancel(&self, abort: RunAbort) -> RunAbort {
        let mut slot = self.abort.lock();
        let winner = slot.get_or_insert(abort).clone();
        self.cancelled.store(true, Ordering::Release);
        winner
    }

    /// Run one remote call under the retry/throttle policy.
    ///
    /// `Ok(None)` means the remote answered "not found".
    pub fn run<T>(
        &self,
        operation: &str,
        mut call: impl FnMut() -> Result<T, RemoteError>,
    ) -> Result<Option<T>, RunAbort> {
        let mut failures = 0u32;

        loop {
            if let Some(abort) = self.abort_reason() {
                return Err(abort);
            }
            self.wait_for_throttle();
            if let Some(abort) = self.abort_reason() {
                return Err(abort);
            }

            let err = match call() {
                Ok(value) => return Ok(Some(value)),
                Err(RemoteError::NotFound(message)) => {
                    debug!(operation, %message, "not found");
                    return Ok(None);
                }
                Err(err) => err,
            };

            failures += 1;
            if !err.is_retryable() || failures > self.policy.max_retries {
                let abort = RunAbort::from_exhausted(operation, failures, err);
                error!(operation, error = %abort, "aborting run");
                return Err(self.cancel(abort));
            }

            warn!(operation, attempt = failures, error = %err, "remote call failed, retrying");
            match err {
                RemoteError::RateLimited { retry_after, .. } => self.note_rate_limit(retry_after),
                _ => thread::sleep(self.policy.backoff_for_attempt(failures - 1)),
            }
        }
    }

    fn note_rate_limit(&self, retry_after: Option<Duration>) {
        let mut throttle = self.throttle.lock();
        throttle.hits += 1;
        let delay = self
            .policy
            .rate_limit_backoff(throttle.hits)
            .max(retry_after.unwrap_or_default().min(MAX_THROTTLE));
        let until = Instant::now() + delay;
        if throttle.until.is_none_or(|current| current < until) {
            throttle.until = Some(until);
        }
        debug!(hits = throttle.hits, delay_ms = delay.as_millis() as u64, "throttling remote calls");
    }

    fn wait_for_throttle(&self) {
        loop {
            let until = self.throttle.lock().until;
            match until {
                Some(until) => {
                    let now = Instant::now();
                    if until <= now {
                        return;
                    }
                    thread::sleep(until - now);
                }
                None => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quick_policy(max_retries: u32) -> NetworkPolicy {
        NetworkPolicy {
            max_retries,
            retry_delay: Duration::ZERO,
            rate_limit_delay: Duration::ZERO,
        }
    }

    #[test]
    fn not_found_is_a_plain_none() {
        let guard = NetworkGuard::new(quick_policy(3));
        let out: Result<Option<()>, _> =
            guard.run("resolving", || Err(RemoteError::NotFound("ref".into())));
        assert_eq!(out, Ok(None));
        assert!(!guard.is_cancelled());
    }

    #[test]
    fn transport_errors_retry_then_succeed() {
        let guard = NetworkGuard::new(quick_policy(3));
        let attempts = Cell::new(0);
        let out = guard.run("resolving", || {
            attempts.set(attempts.get() + 1);
            if attempts.get() < 3 {
                Err(RemoteError::Transport("connection reset".into()))
            } else {
                Ok(7)
            }
        });
        assert_eq!(out, Ok(Some(7)));
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn exhausted_transport_retries_abort_as_connectivity() {
        let guard = NetworkGuard::new(quick_policy(2));
        let attempts = Cell::new(0);
        let out: Result<Option<()>, _> = guard.run("resolving actions/checkout@v4", || {
            attempts.set(attempts.get() + 1);
            Err(RemoteError::Transport("dns failure".into()))
        });

        let abort = out.expect_err("should abort");
        assert!(matches!(abort, RunAbort::Connectivity { attempts: 3, .. }));
        assert_eq!(abort.result(), ValidationResult::NetworkError);
        assert_eq!(attempts.get(), 3);
        assert!(guard.is_cancelled());
    }

    #[test]
    fn authentication_aborts_without_retry() {
        let guard = NetworkGuard::new(quick_policy(5));
        let attempts = Cell::new(0);
        let out: Result<Option<()>, _> = guard.run("resolving", || {
            attempts.set(attempts.get() + 1);
            Err(RemoteError::Authentication("bad credentials".into()))
        });
        assert!(matches!(out, Err(RunAbort::Authentication { .. })));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn first_abort_is_sticky() {
        let guard = NetworkGuard::new(quick_policy(0));
        let _ = guard.run::<()>("first", || Err(RemoteError::Timeout("slow".into())));

        let called = Cell::new(false);
        let out = guard.run("second", || {
            called.set(true);
            Ok(1)
        });
        assert!(matches!(out, Err(RunAbort::Timeout { .. })));
        assert!(!called.get());
    }

    #[test]
    fn rate_limit_raises_shared_throttle() {
        let guard = NetworkGuard::new(NetworkPolicy {
            max_retries: 1,
            retry_delay: Duration::ZERO,
            rate_limit_delay: Duration::from_millis(20),
        });
        let attempts = Cell::new(0);
        let started = Instant::now();
        let out = guard.run("resolving", || {
            attempts.set(attempts.get() + 1);
            if attempts.get() == 1 {
                Err(RemoteError::RateLimited {
                    message: "secondary rate limit".into(),
                    retry_after: None,
                })
            } else {
                Ok(())
            }
        });
        assert_eq!(out, Ok(Some(())));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = NetworkPolicy {
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
            rate_limit_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.rate_limit_backoff(1), Duration::from_millis(100));
        assert_eq!(policy.rate_limit_backoff(3), Duration::from_millis(400));
    }
}
