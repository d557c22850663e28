//! Bounded retry for sink writes
//!
//! A batch is retried on transient store errors only. A uniqueness conflict
//! on the first attempt is returned immediately since retrying the same batch
//! cannot succeed. A conflict on a later attempt may mean an earlier attempt
//! committed before its error was reported, so the batch is checked against
//! the store before the conflict is surfaced.

use std::future::Future;

use crate::error::{AllocationError, DomainError};

/// Run `write` up to `attempts` times (at least once).
///
/// `confirm` reports whether every record of the batch is already stored. It
/// is only consulted when a retry hits a uniqueness conflict; `true` means
/// the earlier attempt landed and the write counts as successful.
pub async fn persist_with_retry<F, Fut, C, CFut>(
    attempts: u32,
    sink: &str,
    batch: usize,
    mut write: F,
    mut confirm: C,
) -> Result<(), AllocationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), DomainError>>,
    C: FnMut() -> CFut,
    CFut: Future<Output = Result<bool, DomainError>>,
{
    let attempts = attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match write().await {
            Ok(()) => return Ok(()),
            Err(DomainError::AlreadyExists(msg)) if attempt == 1 => {
                return Err(DomainError::AlreadyExists(msg).into());
            }
            Err(DomainError::AlreadyExists(msg)) => {
                if confirm().await? {
                    tracing::info!(
                        sink = sink,
                        attempt = attempt,
                        batch = batch,
                        "Earlier attempt was committed, batch already stored"
                    );
                    return Ok(());
                }
                return Err(DomainError::AlreadyExists(msg).into());
            }
            Err(e) => {
                tracing::warn!(
                    sink = sink,
                    attempt = attempt,
                    attempts = attempts,
                    batch = batch,
                    error = %e,
                    "Sink write failed"
                );
                last_error = Some(e);
            }
        }
    }

    Err(AllocationError::PersistenceFailure {
        attempts,
        message: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}
