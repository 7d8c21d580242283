//! Injectable logging capability.
//!
//! Every message the client produces goes through a [`Logger`], so an
//! embedding application can route or silence it.

/// Sink for client log output.
pub trait Logger: Send + Sync + 'static {
    fn log(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Forwards to `tracing` under the `chaintelemetry` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::info!(target: "chaintelemetry", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "chaintelemetry", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "chaintelemetry", "{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "chaintelemetry", "{message}");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}
