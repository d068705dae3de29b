use tracing::debug;

/// Discards a failure that is deliberately not acted on, leaving a debug trace.
pub trait Ignore {
    /// Drops the value, logging a failure at debug level.
    fn ignore(self);
}

impl<T, E: core::fmt::Display> Ignore for Result<T, E> {
    #[track_caller]
    fn ignore(self) {
        if let Err(error) = self {
            debug!(
                "Ignoring error ({}): {error}",
                core::panic::Location::caller()
            );
        }
    }
}

