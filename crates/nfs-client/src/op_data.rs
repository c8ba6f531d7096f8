//! Response accumulation for replicated reads.
//!
//! The first successful outcome resolves the sink straight away. Failures are
//! only reported once every expected holder has failed, or the deadline has
//! passed; the failure reported is the most frequent one seen.

use nfs_core::{NfsError, Result};
use tokio::sync::oneshot;
use tracing::debug;

/// Outcome accumulator feeding a single-assignment sink.
pub struct OpData<T> {
    sink: Option<oneshot::Sender<Result<T>>>,
    expected_count: usize,
    failure_count: usize,
    // Distinct failures in first-seen order, with their counts.
    failures: Vec<(NfsError, usize)>,
}

impl<T> OpData<T> {
    /// Accumulator resolving after `expected_count` failures. Zero is treated as one.
    pub fn new(expected_count: usize, sink: oneshot::Sender<Result<T>>) -> Self {
        Self {
            sink: Some(sink),
            expected_count: expected_count.max(1),
            failure_count: 0,
            failures: Vec::new(),
        }
    }

    /// Whether the sink has been used.
    pub fn is_resolved(&self) -> bool {
        self.sink.is_none()
    }

    /// Feed one holder's outcome. Returns true if this call resolved the sink.
    pub fn handle_outcome(&mut self, outcome: Result<T>) -> bool {
        if self.is_resolved() {
            return false;
        }
        match outcome {
            Ok(value) => self.resolve(Ok(value)),
            Err(error) => {
                self.record_failure(error);
                if self.failure_count < self.expected_count {
                    debug!(
                        failures = self.failure_count,
                        expected = self.expected_count,
                        "accumulated failure response"
                    );
                    return false;
                }
                let representative = self.representative_failure();
                self.resolve(Err(representative))
            }
        }
    }

    /// The deadline passed. Returns true if this call resolved the sink.
    pub fn handle_timeout(&mut self) -> bool {
        if self.is_resolved() {
            return false;
        }
        let error = if self.failures.is_empty() {
            NfsError::Timeout
        } else {
            self.representative_failure()
        };
        self.resolve(Err(error))
    }

    /// Resolve with `error` regardless of what has been accumulated.
    pub fn fail(&mut self, error: NfsError) -> bool {
        if self.is_resolved() {
            return false;
        }
        self.resolve(Err(error))
    }

    fn record_failure(&mut self, error: NfsError) {
        self.failure_count += 1;
        match self.failures.iter_mut().find(|(seen, _)| *seen == error) {
            Some((_, count)) => *count += 1,
            None => self.failures.push((error, 1)),
        }
    }

    fn representative_failure(&self) -> NfsError {
        let mut best: Option<&(NfsError, usize)> = None;
        for entry in &self.failures {
            if best.is_none_or(|(_, count)| entry.1 > *count) {
                best = Some(entry);
            }
        }
        best.map(|(error, _)| error.clone())
            .unwrap_or(NfsError::Timeout)
    }

    fn resolve(&mut self, result: Result<T>) -> bool {
        let Some(sink) = self.sink.take() else {
            return false;
        };
        if sink.send(result).is_err() {
            debug!("result receiver dropped before resolution");
        }
        true
    }
}
