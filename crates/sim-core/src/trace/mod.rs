//! Trace/dump subsystem: traceable values, dumpers, and the dump manager.

/// Trace-sink capability interface and the unknown-read warner.
pub mod dumper;
/// Run-scoped registry for values and dumpers.
pub mod manager;
/// Named instrumented state holders.
pub mod value;
/// VCD waveform dumper.
pub mod vcd;

pub use dumper::{Dumper, WarnUnknown};
pub use manager::{DumpManager, LoadOutcome};
pub use value::{AccessFlags, ShadowHandle, TraceId, TraceValue, MAX_TRACE_BITS};
pub use vcd::{VcdConfig, VcdDumper};
