//! Byte-wide addressable cells: RAM, invalid holes, and peripheral registers.

use crate::diag::AccessViolation;
use crate::memory::AccessContext;
use crate::trace::TraceId;

/// Peripheral seam behind a register-backed cell.
///
/// Implementations hold the device-side state; the cell routes bus accesses
/// into them and handles trace logging itself, so peripheral code never knows
/// dumpers exist.
pub trait IoRegister {
    /// Returns the register's current bus-visible value.
    fn read(&mut self) -> u8;
    /// Applies a bus write, including any side effects.
    fn write(&mut self, value: u8);
}

impl<T: IoRegister> IoRegister for std::rc::Rc<std::cell::RefCell<T>> {
    fn read(&mut self) -> u8 {
        self.borrow_mut().read()
    }

    fn write(&mut self, value: u8) {
        self.borrow_mut().write(value);
    }
}

/// One byte-wide storage/behavior unit occupying one address.
///
/// Every access goes through [`get`]/[`set`], which notify the attached trace
/// value (when one exists) and report invalid accesses on the diagnostic
/// channel. Exactly one cell exists per mapped address.
///
/// [`get`]: MemoryCell::get
/// [`set`]: MemoryCell::set
pub enum MemoryCell {
    /// Plain byte storage.
    Ram {
        /// Stored byte.
        value: u8,
        /// Attached trace value, when the address is instrumented.
        trace: Option<TraceId>,
    },
    /// Unmapped address; accesses are diagnostic-only and never trusted.
    Invalid {
        /// Diagnostic name reported on access.
        name: String,
    },
    /// Register dispatching into peripheral logic.
    Register {
        /// Peripheral-side register behavior.
        backend: Box<dyn IoRegister>,
        /// Attached trace value, when the register is instrumented.
        trace: Option<TraceId>,
    },
}

impl MemoryCell {
    /// Creates an untraced RAM cell.
    #[must_use]
    pub const fn ram() -> Self {
        Self::Ram {
            value: 0,
            trace: None,
        }
    }

    /// Creates a RAM cell attached to a trace value.
    #[must_use]
    pub const fn ram_traced(trace: TraceId) -> Self {
        Self::Ram {
            value: 0,
            trace: Some(trace),
        }
    }

    /// Creates an invalid (unmapped) cell with a diagnostic name.
    #[must_use]
    pub fn invalid(name: String) -> Self {
        Self::Invalid { name }
    }

    /// Creates an untraced peripheral-backed register cell.
    #[must_use]
    pub fn register(backend: Box<dyn IoRegister>) -> Self {
        Self::Register {
            backend,
            trace: None,
        }
    }

    /// Creates a peripheral-backed register cell attached to a trace value.
    #[must_use]
    pub fn register_traced(backend: Box<dyn IoRegister>, trace: TraceId) -> Self {
        Self::Register {
            backend,
            trace: Some(trace),
        }
    }

    /// Handle of the attached trace value, when one exists.
    #[must_use]
    pub const fn trace(&self) -> Option<TraceId> {
        match self {
            Self::Ram { trace, .. } | Self::Register { trace, .. } => *trace,
            Self::Invalid { .. } => None,
        }
    }

    /// Reads the cell, logging a READ access on its trace value.
    ///
    /// Invalid cells report on the diagnostic channel instead and return a
    /// value callers must not depend on.
    pub fn get(&mut self, ctx: &mut AccessContext<'_>) -> u8 {
        match self {
            Self::Ram { value, trace } => {
                if let Some(id) = trace {
                    ctx.tracer.log_read(*id);
                }
                *value
            }
            Self::Register { backend, trace } => {
                if let Some(id) = trace {
                    ctx.tracer.log_read(*id);
                }
                backend.read()
            }
            Self::Invalid { name } => {
                ctx.diag.report(&AccessViolation::read(name, ctx.pc));
                0
            }
        }
    }

    /// Writes the cell, logging a WRITE access (and CHANGE detection) on its
    /// trace value.
    ///
    /// Invalid cells discard the value and report it, together with the
    /// current program counter, on the diagnostic channel.
    pub fn set(&mut self, new_value: u8, ctx: &mut AccessContext<'_>) {
        match self {
            Self::Ram { value, trace } => {
                *value = new_value;
                if let Some(id) = trace {
                    ctx.tracer.log_write(*id, u32::from(new_value));
                }
            }
            Self::Register { backend, trace } => {
                backend.write(new_value);
                if let Some(id) = trace {
                    ctx.tracer.log_write(*id, u32::from(new_value));
                }
            }
            Self::Invalid { name } => {
                ctx.diag
                    .report(&AccessViolation::write(name, new_value, ctx.pc));
            }
        }
    }
}

impl std::fmt::Debug for MemoryCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ram { value, trace } => f
                .debug_struct("Ram")
                .field("value", value)
                .field("trace", trace)
                .finish(),
            Self::Invalid { name } => f.debug_struct("Invalid").field("name", name).finish(),
            Self::Register { trace, .. } => {
                f.debug_struct("Register").field("trace", trace).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{IoRegister, MemoryCell};
    use crate::diag::{AccessKind, BufferedDiag};
    use crate::memory::AccessContext;
    use crate::trace::{DumpManager, TraceValue};

    struct Latch {
        stored: u8,
        writes: usize,
    }

    impl IoRegister for Latch {
        fn read(&mut self) -> u8 {
            self.stored
        }

        fn write(&mut self, value: u8) {
            self.stored = value;
            self.writes += 1;
        }
    }

    #[test]
    fn ram_cell_round_trips_and_logs_accesses() {
        let mut tracer = DumpManager::new();
        let id = tracer.reg_trace(TraceValue::new("SRAM.0x0060", 8)).unwrap();
        tracer.value_mut(id).enable();
        let mut diag = BufferedDiag::new();

        let mut cell = MemoryCell::ram_traced(id);
        let mut ctx = AccessContext {
            tracer: &mut tracer,
            diag: &mut diag,
            pc: 0,
        };
        cell.set(0x42, &mut ctx);
        assert_eq!(cell.get(&mut ctx), 0x42);

        let flags = tracer.value(id).flags();
        assert!(flags.has_read());
        assert!(flags.has_write());
        assert!(flags.has_change());
        assert!(diag.reports().is_empty());
    }

    #[test]
    fn register_cell_dispatches_into_the_backend() {
        let latch = Rc::new(RefCell::new(Latch {
            stored: 0,
            writes: 0,
        }));
        let mut cell = MemoryCell::register(Box::new(Rc::clone(&latch)));

        let mut tracer = DumpManager::new();
        let mut diag = BufferedDiag::new();
        let mut ctx = AccessContext {
            tracer: &mut tracer,
            diag: &mut diag,
            pc: 0,
        };
        cell.set(0x99, &mut ctx);
        assert_eq!(cell.get(&mut ctx), 0x99);
        assert_eq!(latch.borrow().writes, 1);
    }

    #[test]
    fn invalid_cell_reports_reads_and_writes_with_pc() {
        let mut tracer = DumpManager::new();
        let mut diag = BufferedDiag::new();
        let mut cell = MemoryCell::invalid("INVALID.0xFFFF".to_owned());

        let mut ctx = AccessContext {
            tracer: &mut tracer,
            diag: &mut diag,
            pc: 0x0042,
        };
        let _ = cell.get(&mut ctx);
        cell.set(0xAB, &mut ctx);

        let reports = diag.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].kind, AccessKind::InvalidRead);
        assert_eq!(reports[0].pc, 0x0042);
        assert_eq!(reports[1].kind, AccessKind::InvalidWrite);
        assert_eq!(reports[1].value, Some(0xAB));
    }

    #[test]
    fn untraced_cells_touch_no_trace_state() {
        let mut tracer = DumpManager::new();
        let mut diag = BufferedDiag::new();
        let mut cell = MemoryCell::ram();
        let mut ctx = AccessContext {
            tracer: &mut tracer,
            diag: &mut diag,
            pc: 0,
        };
        cell.set(7, &mut ctx);
        assert_eq!(cell.get(&mut ctx), 7);
        assert!(cell.trace().is_none());
    }
}
