//! Bounded-attempt retry for upstream HTTP calls.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::http_client::{HttpClient, HttpRequest, HttpResponse};

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay after every failed attempt.
    Fixed { delay: Duration },
    /// `step * attempt` after the n-th failed attempt (1-based).
    Linear {
        step: Duration,
        /// Adds up to +/- 25% random spread to each delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Linear {
            step: Duration::from_millis(800),
            jitter: false,
        }
    }
}

impl Backoff {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Linear { step, jitter } => {
                let delay = step.saturating_mul(attempt.max(1));
                if !jitter {
                    return delay;
                }

                let spread_ms = (delay.as_millis() / 4) as u64;
                let offset = fastrand::u64(0..=spread_ms.saturating_mul(2));
                let millis = (delay.as_millis() as u64 + offset).saturating_sub(spread_ms);
                Duration::from_millis(millis)
            }
        }
    }

    /// Longest delay [`Backoff::delay`] can return for `attempt`.
    pub fn max_delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Linear { step, jitter } => {
                let delay = step.saturating_mul(attempt.max(1));
                if jitter {
                    delay + delay / 4
                } else {
                    delay
                }
            }
        }
    }
}

/// Attempt budget and backoff for one adapter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
        }
    }
}

/// Why a call produced no usable response after all attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted {
    pub attempts: u32,
    /// Status of the last response, if the provider answered at all.
    pub last_status: Option<u16>,
    pub reason: String,
}

impl Display for RetryExhausted {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} after {} attempt(s)", self.reason, self.attempts)
    }
}

impl std::error::Error for RetryExhausted {}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Linear {
                step,
                jitter: false,
            },
        }
    }

    /// Retries without sleeping; used by tests and the diagnostics probe.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed {
                delay: Duration::ZERO,
            },
        }
    }

    /// Turns random spread on or off; fixed delays are left alone.
    pub fn with_jitter(mut self, enabled: bool) -> Self {
        if let Backoff::Linear { jitter, .. } = &mut self.backoff {
            *jitter = enabled;
        }
        self
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }

    /// Worst-case wall time of [`RetryPolicy::execute`] when every attempt
    /// runs into `attempt_timeout`.
    pub fn budget(&self, attempt_timeout: Duration) -> Duration {
        let max_attempts = self.max_attempts.max(1);
        (1..max_attempts).fold(
            attempt_timeout.saturating_mul(max_attempts),
            |total, attempt| total.saturating_add(self.backoff.max_delay(attempt)),
        )
    }

    /// Sends `request` until a 2xx arrives or the budget is spent.
    ///
    /// Sleeping goes through the tokio timer so concurrent requests keep
    /// being served while one provider backs off.
    pub async fn execute(
        &self,
        client: &dyn HttpClient,
        request: &HttpRequest,
    ) -> Result<HttpResponse, RetryExhausted> {
        let max_attempts = self.max_attempts.max(1);
        let mut last_status = None;
        let mut reason = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            match client.execute(request.clone()).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => {
                    last_status = Some(response.status);
                    reason = format!("upstream returned status {}", response.status);
                }
                Err(error) => {
                    last_status = None;
                    reason = format!("transport error: {error}");
                    if !error.retryable() {
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_status,
                            reason,
                        });
                    }
                }
            }

            if attempt < max_attempts {
                let delay = self.delay_for_attempt(attempt);
                tracing::debug!(
                    url = %request.redacted_url(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    %reason,
                    "retrying upstream call"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(RetryExhausted {
            attempts: max_attempts,
            last_status,
            reason,
        })
    }
}
