//! Trace-sink capability interface and the unknown-read warner.

use crate::error::SinkError;
use crate::trace::value::{TraceId, TraceValue};

/// Capability set implemented by every trace sink.
///
/// All event hooks default to no-ops so concrete dumpers only implement what
/// they consume. The dump manager drives the calls; dumpers never pull state
/// from values outside a hook.
pub trait Dumper {
    /// Pure predicate deciding whether this dumper wants to observe `tv`.
    ///
    /// Queried by the manager when the dumper is added; must stay consistent
    /// until the next [`set_active_signals`] epoch.
    ///
    /// [`set_active_signals`]: Dumper::set_active_signals
    fn wants(&self, tv: &TraceValue) -> bool;

    /// Receives the finalized ordered list of values this dumper observes.
    ///
    /// A waveform dumper uses this to assign stable per-signal identifiers.
    fn set_active_signals(&mut self, signals: &[(TraceId, &TraceValue)]) {
        let _ = signals;
    }

    /// Opens the observation window (open files, write headers).
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the output target cannot be prepared.
    fn start(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Closes the observation window, flushing any buffered output.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when flushing or closing the output fails.
    fn stop(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Advances this dumper's notion of time by one simulated clock cycle.
    ///
    /// Called before any mark hook for that cycle.
    fn cycle(&mut self) {}

    /// A previously-written value was read this cycle.
    fn mark_read(&mut self, id: TraceId, tv: &TraceValue) {
        let _ = (id, tv);
    }

    /// A value was read before ever being written.
    fn mark_read_unknown(&mut self, id: TraceId, tv: &TraceValue) {
        let _ = (id, tv);
    }

    /// A value was written this cycle.
    fn mark_write(&mut self, id: TraceId, tv: &TraceValue) {
        let _ = (id, tv);
    }

    /// A value changed this cycle, by write or by shadow diff.
    fn mark_change(&mut self, id: TraceId, tv: &TraceValue) {
        let _ = (id, tv);
    }
}

/// Dumper that warns about reads of uninitialized state.
///
/// Catches firmware bugs like reading SRAM before anything stored to it; the
/// warnings go to the `log` facade, next to the invalid-access diagnostics.
#[derive(Debug, Default)]
pub struct WarnUnknown {
    hits: u64,
}

impl WarnUnknown {
    /// Creates the warner.
    #[must_use]
    pub const fn new() -> Self {
        Self { hits: 0 }
    }

    /// Number of unknown reads reported so far.
    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }
}

impl Dumper for WarnUnknown {
    fn wants(&self, _tv: &TraceValue) -> bool {
        true
    }

    fn mark_read_unknown(&mut self, _id: TraceId, tv: &TraceValue) {
        self.hits += 1;
        log::warn!("read of uninitialized value {}", tv.name());
    }
}
