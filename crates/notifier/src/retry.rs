//! Per-subscriber delivery with bounded retries.
//!
//! Each subscriber runs its own small state machine:
//!
//! ```text
//! Attempting(n) ──ok──────────────────────────▶ Delivered
//!      │ ──gone───────────────────────────────▶ Failed(Gone)
//!      │ ──retryable, n == max ───────────────▶ Failed(Exhausted)
//!      └─retryable, n < max ─▶ Retrying(n+1) ─(backoff)─▶ Attempting(n+1)
//! ```
//!
//! Attempts are numbered from 1; the backoff exponent is the 0-based retry index,
//! so the wait before attempt 2 is `backoff(0)`.

use std::fmt;

use beacon_common::types::Subscription;

use crate::error::DeliveryError;
use crate::profile::DeliveryProfile;
use crate::transport::{DeliveryOptions, PushTransport};

/// Why a subscriber could not be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    /// The push service reported the subscription as expired or revoked
    Gone,
    /// Every attempt failed with a retryable error
    Exhausted,
    /// The delivery task panicked or was cancelled
    Aborted,
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalReason::Gone => write!(f, "gone"),
            TerminalReason::Exhausted => write!(f, "exhausted"),
            TerminalReason::Aborted => write!(f, "aborted"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TerminalFailure {
    pub reason: TerminalReason,
    /// Attempts made before giving up
    pub attempts: u32,
    /// Error of the last attempt
    pub error: DeliveryError,
}

#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Failed(TerminalFailure),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

#[derive(Debug, Clone, Copy)]
enum DeliveryState {
    Attempting(u32),
    Retrying(u32),
}

/// Deliver `payload` to one subscriber, retrying retryable failures up to
/// `max_attempts` times in total. A `max_attempts` of 0 is treated as 1.
pub async fn deliver_with_retry(
    transport: &dyn PushTransport,
    subscription: &Subscription,
    payload: &str,
    max_attempts: u32,
) -> DeliveryOutcome {
    let max_attempts = max_attempts.max(1);
    let profile = DeliveryProfile::classify(&subscription.endpoint);
    let options = profile.delivery_options();
    let endpoint = subscription.log_label();

    let mut state = DeliveryState::Attempting(1);
    loop {
        match state {
            DeliveryState::Attempting(attempt) => {
                let error = match send_once(transport, subscription, payload, &options).await {
                    Ok(()) => {
                        tracing::debug!(
                            endpoint = %endpoint,
                            attempt,
                            profile = %profile,
                            "Push delivered"
                        );
                        return DeliveryOutcome::Delivered { attempts: attempt };
                    }
                    Err(e) => e,
                };

                if error.is_gone() {
                    tracing::info!(
                        endpoint = %endpoint,
                        attempt,
                        profile = %profile,
                        status = ?error.status_code,
                        "Subscription gone, not retrying"
                    );
                    return DeliveryOutcome::Failed(TerminalFailure {
                        reason: TerminalReason::Gone,
                        attempts: attempt,
                        error,
                    });
                }

                if attempt >= max_attempts {
                    tracing::warn!(
                        endpoint = %endpoint,
                        attempt,
                        max_attempts,
                        profile = %profile,
                        error = %error,
                        "Push delivery failed, retries exhausted"
                    );
                    return DeliveryOutcome::Failed(TerminalFailure {
                        reason: TerminalReason::Exhausted,
                        attempts: attempt,
                        error,
                    });
                }

                tracing::debug!(
                    endpoint = %endpoint,
                    attempt,
                    max_attempts,
                    profile = %profile,
                    error = %error,
                    "Push delivery failed, will retry"
                );
                state = DeliveryState::Retrying(attempt + 1);
            }
            DeliveryState::Retrying(next_attempt) => {
                // Wait before attempt 2 uses retry index 0
                let delay = profile.backoff(next_attempt - 2);
                tracing::debug!(
                    endpoint = %endpoint,
                    next_attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off"
                );
                tokio::time::sleep(delay).await;
                state = DeliveryState::Attempting(next_attempt);
            }
        }
    }
}

/// One bounded send. An elapsed timeout is reported as a retryable failure.
pub(crate) async fn send_once(
    transport: &dyn PushTransport,
    subscription: &Subscription,
    payload: &str,
    options: &DeliveryOptions,
) -> Result<(), DeliveryError> {
    match tokio::time::timeout(
        options.timeout,
        transport.send(subscription, payload, options),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(DeliveryError::timeout(&subscription.endpoint, options.timeout)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;

    /// Transport replaying a fixed script of results, then succeeding.
    struct Scripted {
        script: Mutex<VecDeque<Result<(), DeliveryError>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(script: Vec<Result<(), DeliveryError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl PushTransport for Scripted {
        async fn send(
            &self,
            _subscription: &Subscription,
            _payload: &str,
            _options: &DeliveryOptions,
        ) -> Result<(), DeliveryError> {
            *self.calls.lock().unwrap() += 1;
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    /// Transport that never answers.
    struct Hanging;

    #[async_trait]
    impl PushTransport for Hanging {
        async fn send(
            &self,
            _subscription: &Subscription,
            _payload: &str,
            _options: &DeliveryOptions,
        ) -> Result<(), DeliveryError> {
            std::future::pending().await
        }
    }

    /// Paused-clock timers fire on millisecond ticks, so allow a little slack.
    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed <= expected + Duration::from_millis(10),
            "elapsed {elapsed:?}, expected about {expected:?}"
        );
    }

    const FCM: &str = "https://fcm.googleapis.com/fcm/send/abc";
    const APPLE: &str = "https://web.push.apple.com/QGr0abc";

    fn sub(endpoint: &str) -> Subscription {
        Subscription::new(endpoint, "p256", "auth")
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_has_no_delay() {
        let transport = Scripted::new(vec![]);
        let start = Instant::now();

        let outcome = deliver_with_retry(&transport, &sub(FCM), "{}", 3).await;

        assert!(matches!(outcome, DeliveryOutcome::Delivered { attempts: 1 }));
        assert_elapsed(start, Duration::ZERO);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds_with_standard_backoff() {
        let transport = Scripted::new(vec![
            Err(DeliveryError::from_status(FCM, 503, "unavailable")),
            Err(DeliveryError::retryable(FCM, "connection reset")),
        ]);
        let start = Instant::now();

        let outcome = deliver_with_retry(&transport, &sub(FCM), "{}", 3).await;

        assert!(matches!(outcome, DeliveryOutcome::Delivered { attempts: 3 }));
        // backoff(0) + backoff(1) = 1s + 2s
        assert_elapsed(start, Duration::from_millis(3_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restrictive_backoff_is_longer() {
        let transport = Scripted::new(vec![
            Err(DeliveryError::from_status(APPLE, 500, "err")),
            Err(DeliveryError::from_status(APPLE, 500, "err")),
        ]);
        let start = Instant::now();

        let outcome = deliver_with_retry(&transport, &sub(APPLE), "{}", 3).await;

        assert!(outcome.is_delivered());
        // 5s + 10s
        assert_elapsed(start, Duration::from_millis(15_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_after_max_attempts() {
        let transport = Scripted::new(vec![
            Err(DeliveryError::retryable(FCM, "a")),
            Err(DeliveryError::retryable(FCM, "b")),
            Err(DeliveryError::retryable(FCM, "c")),
            Err(DeliveryError::retryable(FCM, "never reached")),
        ]);

        let outcome = deliver_with_retry(&transport, &sub(FCM), "{}", 3).await;

        match outcome {
            DeliveryOutcome::Failed(failure) => {
                assert_eq!(failure.reason, TerminalReason::Exhausted);
                assert_eq!(failure.attempts, 3);
                assert_eq!(failure.error.message, "c");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gone_short_circuits() {
        let transport = Scripted::new(vec![
            Err(DeliveryError::retryable(FCM, "flaky")),
            Err(DeliveryError::gone(FCM)),
        ]);
        let start = Instant::now();

        let outcome = deliver_with_retry(&transport, &sub(FCM), "{}", 3).await;

        match outcome {
            DeliveryOutcome::Failed(failure) => {
                assert_eq!(failure.reason, TerminalReason::Gone);
                assert_eq!(failure.attempts, 2);
            }
            other => panic!("expected gone, got {other:?}"),
        }
        assert_eq!(transport.calls(), 2);
        assert_elapsed(start, Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restrictive_gone_on_first_attempt() {
        let transport = Scripted::new(vec![Err(DeliveryError::gone(APPLE))]);
        let start = Instant::now();

        let outcome = deliver_with_retry(&transport, &sub(APPLE), "{}", 3).await;

        assert!(matches!(
            outcome,
            DeliveryOutcome::Failed(TerminalFailure {
                reason: TerminalReason::Gone,
                attempts: 1,
                ..
            })
        ));
        assert_eq!(transport.calls(), 1);
        assert_elapsed(start, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_send_times_out_per_attempt() {
        let start = Instant::now();

        let outcome = deliver_with_retry(&Hanging, &sub(FCM), "{}", 2).await;

        match outcome {
            DeliveryOutcome::Failed(failure) => {
                assert_eq!(failure.reason, TerminalReason::Exhausted);
                assert_eq!(failure.error.status_code, None);
            }
            other => panic!("expected timeout failure, got {other:?}"),
        }
        // 30s timeout + 1s backoff + 30s timeout
        assert_elapsed(start, Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_max_attempts_still_tries_once() {
        let transport = Scripted::new(vec![Err(DeliveryError::retryable(FCM, "x"))]);

        let outcome = deliver_with_retry(&transport, &sub(FCM), "{}", 0).await;

        assert!(!outcome.is_delivered());
        assert_eq!(transport.calls(), 1);
    }
}
