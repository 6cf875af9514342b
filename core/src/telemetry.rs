//! Error reporting funnel.
//!
//! Every failed call passes its error through [`ErrorReporter::report`] once,
//! tagged with the facade operation that produced it, and then propagates it
//! unchanged.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::ClientError;

/// External telemetry backend. Fire-and-forget: must not block.
pub trait TelemetrySink: Send + Sync {
    fn report(&self, error: &ClientError, origin: &str);
}

/// Default sink: records the failure in the `tracing` stream only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn report(&self, error: &ClientError, origin: &str) {
        tracing::warn!(origin, %error, "api call failed");
    }
}

#[derive(Clone)]
pub struct ErrorReporter {
    sink: Arc<dyn TelemetrySink>,
}

impl ErrorReporter {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self { sink }
    }

    /// Hand `error` to the sink and give it back for propagation.
    pub fn report(&self, error: ClientError, origin: &'static str) -> ClientError {
        // A panicking sink must not turn a failed call into a crash.
        if catch_unwind(AssertUnwindSafe(|| self.sink.report(&error, origin))).is_err() {
            tracing::error!(origin, "telemetry sink panicked");
        }
        error
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter").finish_non_exhaustive()
    }
}
