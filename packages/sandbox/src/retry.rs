// ABOUTME: Bounded linear polling combinator with injectable sleep
// ABOUTME: Shared by the readiness probe so retry behavior is unit-testable without real delays

use std::future::Future;
use std::time::Duration;

/// Attempt budget and fixed inter-attempt interval.
///
/// Linear, not exponential: the expected wait is short and predictable
/// because the in-sandbox service startup order is fixed.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

/// Outcome of one poll attempt.
#[derive(Debug)]
pub enum Attempt<T, E> {
    /// Condition met; stop polling
    Ready(T),
    /// Not there yet; sleep and try again
    Retry,
    /// Unambiguously broken; stop polling early
    Fatal(E),
}

/// Why polling stopped without success.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    Timeout { attempts: u32 },
    Fatal(E),
}

/// Poll until ready, fatal, or the attempt budget is exhausted.
///
/// `sleep` runs between attempts but not after the last one. Callers pass
/// `tokio::time::sleep`; tests pass a recording stub.
pub async fn poll_until<T, E, P, PFut, S, SFut>(
    policy: RetryPolicy,
    mut poll: P,
    mut sleep: S,
) -> Result<T, RetryError<E>>
where
    P: FnMut(u32) -> PFut,
    PFut: Future<Output = Attempt<T, E>>,
    S: FnMut(Duration) -> SFut,
    SFut: Future<Output = ()>,
{
    for attempt in 1..=policy.max_attempts {
        match poll(attempt).await {
            Attempt::Ready(value) => return Ok(value),
            Attempt::Fatal(error) => return Err(RetryError::Fatal(error)),
            Attempt::Retry => {
                if attempt < policy.max_attempts {
                    sleep(policy.interval).await;
                }
            }
        }
    }

    Err(RetryError::Timeout {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            interval: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_ready_on_first_attempt_never_sleeps() {
        let sleeps = RefCell::new(Vec::new());

        let result: Result<u32, RetryError<String>> = poll_until(
            policy(30),
            |_| async { Attempt::Ready(7) },
            |d| {
                sleeps.borrow_mut().push(d);
                async {}
            },
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert!(sleeps.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_ready_after_retries_sleeps_between_attempts() {
        let sleeps = RefCell::new(Vec::new());

        let result: Result<&str, RetryError<String>> = poll_until(
            policy(5),
            |attempt| async move {
                if attempt < 3 {
                    Attempt::Retry
                } else {
                    Attempt::Ready("up")
                }
            },
            |d| {
                sleeps.borrow_mut().push(d);
                async {}
            },
        )
        .await;

        assert_eq!(result.unwrap(), "up");
        assert_eq!(sleeps.borrow().len(), 2);
        assert!(sleeps.borrow().iter().all(|d| *d == Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_budget_exhaustion_yields_timeout_with_attempt_count() {
        let sleeps = RefCell::new(Vec::new());

        let result: Result<(), RetryError<String>> = poll_until(
            policy(4),
            |_| async { Attempt::Retry },
            |d| {
                sleeps.borrow_mut().push(d);
                async {}
            },
        )
        .await;

        assert_eq!(result.unwrap_err(), RetryError::Timeout { attempts: 4 });
        // No sleep after the final attempt.
        assert_eq!(sleeps.borrow().len(), 3);
    }

    #[tokio::test]
    async fn test_fatal_short_circuits_remaining_budget() {
        let polls = RefCell::new(0u32);

        let result: Result<(), RetryError<&str>> = poll_until(
            policy(30),
            |_| {
                *polls.borrow_mut() += 1;
                let n = *polls.borrow();
                async move {
                    if n == 2 {
                        Attempt::Fatal("broken")
                    } else {
                        Attempt::Retry
                    }
                }
            },
            |_| async {},
        )
        .await;

        assert_eq!(result.unwrap_err(), RetryError::Fatal("broken"));
        assert_eq!(*polls.borrow(), 2);
    }
}
