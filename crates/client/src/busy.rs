//! Busy indicator shown while a submission is in flight.

/// Switched on when a submission starts and off once its response has been handled.
pub trait BusyIndicator: Send + Sync {
    fn enable(&self);
    fn disable(&self);
}

/// Reports the busy state through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingBusyIndicator;

impl BusyIndicator for TracingBusyIndicator {
    fn enable(&self) {
        tracing::info!("submitting");
    }

    fn disable(&self) {
        tracing::debug!("submission finished");
    }
}
