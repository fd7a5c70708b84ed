use thiserror::Error;

/// Configuration errors raised while wiring trace values into a device.
///
/// These reflect device-construction bugs, not runtime simulation events, so
/// callers are expected to treat them as fatal during device build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    /// A trace value with the same fully-qualified name is already registered.
    #[error("trace value '{0}' is already registered")]
    DuplicateName(String),
}

/// Output-sink failures surfaced at dumper `start`/`stop` boundaries.
///
/// The per-cycle hot path never propagates these; a failing sink is reported
/// once and the remaining dumpers keep receiving events.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The underlying output target failed.
    #[error("trace sink I/O failure: {0}")]
    Io(#[from] std::io::Error),
}
