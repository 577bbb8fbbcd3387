// ABOUTME: Readiness probe polling the in-sandbox supervisor until all services run
// ABOUTME: Bounded linear retries with early abort on confirmed-fatal service states

use crate::error::ReadinessError;
use crate::handle::SandboxHandle;
use crate::retry::{poll_until, Attempt, RetryError, RetryPolicy};
use crate::types::ServiceState;
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A terminal service state must be observed on this many consecutive
/// polls before the probe aborts; a single observation can be a benign
/// supervisor restart blip.
const FATAL_CONFIRMATION_POLLS: u32 = 2;

/// Attempt budget and interval for the readiness wait.
#[derive(Debug, Clone, Copy)]
pub struct ProbeConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(2),
        }
    }
}

/// Block until every service inside the sandbox reports RUNNING.
///
/// Request-level failures count as "not yet ready": the window between
/// container start and the API binding its socket is expected to refuse
/// connections. Exhausting the budget yields `Timeout`; a service stuck
/// in a terminal state fails fast with `ServiceFatal` instead of burning
/// the remaining budget.
pub async fn await_ready(
    handle: &SandboxHandle,
    config: &ProbeConfig,
) -> Result<(), ReadinessError> {
    let policy = RetryPolicy {
        max_attempts: config.max_attempts,
        interval: config.interval,
    };
    let terminal_streaks: RefCell<HashMap<String, u32>> = RefCell::new(HashMap::new());
    let streaks = &terminal_streaks;

    let outcome = poll_until(
        policy,
        move |attempt| {
            async move {
                let status = match handle.supervisor_status().await {
                    Ok(status) => status,
                    Err(e) => {
                        debug!(
                            "Sandbox {} not reachable on attempt {}: {}",
                            handle.name(),
                            attempt,
                            e
                        );
                        return Attempt::Retry;
                    }
                };

                if !status.success || status.data.is_empty() {
                    // The supervisor answers before its program list loads.
                    debug!(
                        "Sandbox {} supervisor not reporting services yet (attempt {})",
                        handle.name(),
                        attempt
                    );
                    return Attempt::Retry;
                }

                let mut streaks = streaks.borrow_mut();
                for service in &status.data {
                    if service.state.is_terminal() {
                        let count = streaks.entry(service.name.clone()).or_insert(0);
                        *count += 1;
                        if *count >= FATAL_CONFIRMATION_POLLS {
                            warn!(
                                "Service {} in sandbox {} stuck in {} state",
                                service.name,
                                handle.name(),
                                service.state
                            );
                            return Attempt::Fatal(ReadinessError::ServiceFatal {
                                service: service.name.clone(),
                                state: service.state.to_string(),
                            });
                        }
                    } else {
                        streaks.remove(&service.name);
                    }
                }

                if status.data.iter().all(|s| s.state == ServiceState::Running) {
                    info!(
                        "Sandbox {} ready after {} attempt(s)",
                        handle.name(),
                        attempt
                    );
                    Attempt::Ready(())
                } else {
                    debug!(
                        "Sandbox {} waiting on services: {:?} (attempt {})",
                        handle.name(),
                        status
                            .data
                            .iter()
                            .filter(|s| s.state != ServiceState::Running)
                            .map(|s| format!("{}={}", s.name, s.state))
                            .collect::<Vec<_>>(),
                        attempt
                    );
                    Attempt::Retry
                }
            }
        },
        tokio::time::sleep,
    )
    .await;

    match outcome {
        Ok(()) => Ok(()),
        Err(RetryError::Fatal(error)) => Err(error),
        Err(RetryError::Timeout { attempts }) => Err(ReadinessError::Timeout { attempts }),
    }
}
