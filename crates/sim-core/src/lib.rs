//! Addressable-cell and trace subsystem for the octal8 microcontroller
//! simulator.
//!
//! Every read or write the simulated core performs goes through one
//! [`MemoryCell`] in an [`AddressSpace`]; cells dispatch into peripheral
//! logic via [`IoRegister`] and report accesses to the [`DumpManager`],
//! which fans events out to pluggable [`Dumper`] sinks (unknown-read
//! warnings, VCD waveforms). The opcode execute loop, peripheral protocol
//! models, and debug front ends are external collaborators that consume
//! these boundaries.

/// Diagnostic channel for invalid memory accesses.
pub mod diag;
pub use diag::{AccessKind, AccessViolation, BufferedDiag, DiagSink, LogDiag};

/// Configuration-error and sink-failure taxonomy.
pub mod error;
pub use error::{SinkError, TraceError};

/// Addressable-cell memory model.
pub mod memory;
pub use memory::{AccessContext, AddressSpace, IoRegister, MemoryCell, OffsetWindow};

/// Core status register bitmask.
pub mod sreg;
pub use sreg::{
    StatusFlag, StatusRegister, SREG_C, SREG_H, SREG_I, SREG_N, SREG_S, SREG_T, SREG_V, SREG_Z,
};

/// Trace values, dumpers, and the dump manager.
pub mod trace;
pub use trace::{
    AccessFlags, DumpManager, Dumper, LoadOutcome, ShadowHandle, TraceId, TraceValue, VcdConfig,
    VcdDumper, WarnUnknown, MAX_TRACE_BITS,
};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
