//! Progress observer interface
//!
//! Defines the collaborator trait through which a tower pass reports to
//! whatever front end drives it.

use std::sync::Arc;

/// Observer for tower pass notifications
///
/// Implement this trait to receive status text, progress and control-state
/// changes. Calls are made synchronously from the thread running the pass;
/// implementations must not assume any particular delivery latency on the
/// receiving side.
pub trait ProgressObserver: Send + Sync {
    /// Called with human-readable status text
    fn on_status(&self, _text: &str) {}

    /// Called with the percent complete (0-100)
    fn on_progress(&self, _percent: u8) {}

    /// Called with `false` when a pass starts and `true` when it ends
    fn on_enable_controls(&self, _enabled: bool) {}
}

/// Default no-op observer implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl ProgressObserver for NoOpObserver {}

/// Arc-wrapped observer for thread-safe sharing
pub type ProgressObserverHandle = Arc<dyn ProgressObserver>;
