use crate::error::CoordError;

/// Bookkeeping for an operation made of independently committed writes.
///
/// Steps are recorded as they commit. A failure before any commit is returned
/// untouched; a failure after a commit is either reported as compensated (the
/// earlier writes were undone) or turned into a [`CoordError::PartialFailure`].
#[derive(Debug)]
pub(crate) struct Saga {
    operation: &'static str,
    completed: Vec<&'static str>,
}

impl Saga {
    pub fn new(operation: &'static str) -> Saga {
        Saga {
            operation,
            completed: Vec::new(),
        }
    }

    pub fn commit(&mut self, step: &'static str) {
        tracing::debug!(operation = self.operation, step, "step committed");
        self.completed.push(step);
    }

    pub fn has_committed(&self) -> bool {
        !self.completed.is_empty()
    }

    /// `step` failed and nothing that already committed is undone.
    pub fn fail(&self, step: &'static str, error: CoordError) -> CoordError {
        if self.completed.is_empty() {
            return error;
        }

        tracing::error!(
            operation = self.operation,
            step,
            completed = ?self.completed,
            error = %error,
            "partial failure, committed steps were kept"
        );
        CoordError::PartialFailure {
            operation: self.operation,
            step,
            completed: self.completed.clone(),
            source: Box::new(error),
        }
    }

    /// Runs `undo` for a failed `step`. `undo` reverts the last `undone`
    /// committed steps; if that leaves nothing committed the original error is
    /// returned, otherwise (or if `undo` itself fails) a partial failure.
    pub async fn rollback<F>(
        &mut self,
        step: &'static str,
        error: CoordError,
        undone: usize,
        undo: F,
    ) -> CoordError
    where
        F: std::future::Future<Output = Result<(), CoordError>> + Send,
    {
        if !self.has_committed() {
            return error;
        }

        match undo.await {
            Ok(()) => {
                let keep = self.completed.len().saturating_sub(undone);
                let reverted = self.completed.split_off(keep);
                tracing::warn!(
                    operation = self.operation,
                    step,
                    reverted = ?reverted,
                    error = %error,
                    "step failed, compensated"
                );
                if self.completed.is_empty() {
                    error
                } else {
                    self.fail(step, error)
                }
            }
            Err(undo_error) => {
                tracing::error!(
                    operation = self.operation,
                    step,
                    error = %undo_error,
                    "compensation failed"
                );
                self.fail(step, error)
            }
        }
    }
}
