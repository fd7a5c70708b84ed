//! Diagnostic channel for invalid memory accesses.
//!
//! Reports travel out-of-band from the trace-file formats: the default sink
//! forwards to the `log` facade (stderr-equivalent), and hosts that need to
//! inspect reports programmatically can install [`BufferedDiag`] instead.

use std::fmt;

/// Direction of a faulting access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessKind {
    /// Read from an unmapped or invalid cell.
    InvalidRead,
    /// Write to an unmapped or invalid cell.
    InvalidWrite,
}

/// One invalid-access report: the faulting cell, the offending value for
/// writes, and the program counter at the time of the access.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AccessViolation {
    /// Diagnostic name of the cell that was accessed.
    pub cell: String,
    /// Whether the access was a read or a write.
    pub kind: AccessKind,
    /// Value the caller tried to store (writes only).
    pub value: Option<u8>,
    /// Program counter of the simulated core when the access happened.
    pub pc: u32,
}

impl AccessViolation {
    /// Builds a report for an invalid read.
    #[must_use]
    pub fn read(cell: &str, pc: u32) -> Self {
        Self {
            cell: cell.to_owned(),
            kind: AccessKind::InvalidRead,
            value: None,
            pc,
        }
    }

    /// Builds a report for an invalid write of `value`.
    #[must_use]
    pub fn write(cell: &str, value: u8, pc: u32) -> Self {
        Self {
            cell: cell.to_owned(),
            kind: AccessKind::InvalidWrite,
            value: Some(value),
            pc,
        }
    }
}

impl fmt::Display for AccessViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AccessKind::InvalidRead => {
                write!(f, "invalid read access to {}, PC=0x{:04X}", self.cell, self.pc)
            }
            AccessKind::InvalidWrite => write!(
                f,
                "invalid write access to {}, trying to set value [0x{:02X}], PC=0x{:04X}",
                self.cell,
                self.value.unwrap_or(0),
                self.pc
            ),
        }
    }
}

/// Sink for invalid-access reports.
///
/// Exactly one sink is wired into each [`AccessContext`]; peripheral and cell
/// code never needs to know which implementation is installed.
///
/// [`AccessContext`]: crate::memory::AccessContext
pub trait DiagSink {
    /// Records one invalid-access report.
    fn report(&mut self, violation: &AccessViolation);
}

/// Default sink: forwards every report to `log::warn!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiag;

impl DiagSink for LogDiag {
    fn report(&mut self, violation: &AccessViolation) {
        log::warn!("{violation}");
    }
}

/// Buffering sink that retains every report for later inspection.
#[derive(Debug, Default)]
pub struct BufferedDiag {
    reports: Vec<AccessViolation>,
}

impl BufferedDiag {
    /// Creates an empty buffering sink.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reports: Vec::new(),
        }
    }

    /// Returns all reports recorded so far, oldest first.
    #[must_use]
    pub fn reports(&self) -> &[AccessViolation] {
        &self.reports
    }

    /// Drains and returns all recorded reports.
    pub fn take(&mut self) -> Vec<AccessViolation> {
        std::mem::take(&mut self.reports)
    }
}

impl DiagSink for BufferedDiag {
    fn report(&mut self, violation: &AccessViolation) {
        self.reports.push(violation.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessKind, AccessViolation, BufferedDiag, DiagSink};

    #[test]
    fn read_report_formats_cell_and_pc() {
        let report = AccessViolation::read("INVALID.0xFFFF", 0x0042);
        assert_eq!(report.kind, AccessKind::InvalidRead);
        assert_eq!(
            report.to_string(),
            "invalid read access to INVALID.0xFFFF, PC=0x0042"
        );
    }

    #[test]
    fn write_report_includes_offending_value() {
        let report = AccessViolation::write("INVALID.0x0060", 0x80, 0x1234);
        assert_eq!(
            report.to_string(),
            "invalid write access to INVALID.0x0060, trying to set value [0x80], PC=0x1234"
        );
    }

    #[test]
    fn buffered_sink_retains_reports_in_order() {
        let mut sink = BufferedDiag::new();
        sink.report(&AccessViolation::read("A", 0));
        sink.report(&AccessViolation::write("B", 1, 2));
        assert_eq!(sink.reports().len(), 2);
        assert_eq!(sink.reports()[0].cell, "A");

        let drained = sink.take();
        assert_eq!(drained.len(), 2);
        assert!(sink.reports().is_empty());
    }
}
