//! Addressable-cell memory model: backing table, cells, offset windows.

/// Cell variants and the peripheral register seam.
pub mod cell;
/// Base-offset remapping windows.
pub mod offsets;

pub use cell::{IoRegister, MemoryCell};
pub use offsets::OffsetWindow;

use crate::diag::DiagSink;
use crate::trace::DumpManager;

/// Per-access context threaded through every cell operation.
///
/// Carries the trace registry, the diagnostic sink, and the current program
/// counter, so neither cells nor peripherals need process-global state to
/// log accesses or report faults.
pub struct AccessContext<'a> {
    /// Trace registry receiving read/write logs.
    pub tracer: &'a mut DumpManager,
    /// Sink for invalid-access reports.
    pub diag: &'a mut dyn DiagSink,
    /// Program counter of the simulated core, for diagnostics.
    pub pc: u32,
}

/// The shared physical backing table of one device's address space.
///
/// Every address holds exactly one [`MemoryCell`]; unmapped addresses hold an
/// invalid cell whose accesses are reported, not fatal. Logical regions are
/// exposed through [`OffsetWindow`]s over this table.
#[derive(Debug)]
pub struct AddressSpace {
    cells: Vec<MemoryCell>,
}

impl AddressSpace {
    /// Creates a table of `size` addresses, all initially unmapped.
    ///
    /// Unmapped cells report as `INVALID.0x{addr:04X}` until a peripheral or
    /// RAM region is attached over them.
    #[must_use]
    pub fn new(size: usize) -> Self {
        let cells = (0..size)
            .map(|addr| MemoryCell::invalid(format!("INVALID.0x{addr:04X}")))
            .collect();
        Self { cells }
    }

    /// Number of addresses in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the table has no addresses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Attaches `cell` at `addr`, replacing whatever was mapped there.
    ///
    /// Called at device-construction time only; the mapping is fixed during
    /// simulation.
    ///
    /// # Panics
    ///
    /// Panics when `addr` is outside the table.
    pub fn attach(&mut self, addr: usize, cell: MemoryCell) {
        self.cells[addr] = cell;
    }

    /// Direct access to the cell at `addr`.
    ///
    /// # Panics
    ///
    /// Panics when `addr` is outside the table.
    #[must_use]
    pub fn cell_mut(&mut self, addr: usize) -> &mut MemoryCell {
        &mut self.cells[addr]
    }

    /// Reads the byte at `addr` with trace/diagnostic side effects.
    ///
    /// # Panics
    ///
    /// Panics when `addr` is outside the table.
    pub fn read(&mut self, addr: usize, ctx: &mut AccessContext<'_>) -> u8 {
        self.cells[addr].get(ctx)
    }

    /// Writes the byte at `addr` with trace/diagnostic side effects.
    ///
    /// # Panics
    ///
    /// Panics when `addr` is outside the table.
    pub fn write(&mut self, addr: usize, value: u8, ctx: &mut AccessContext<'_>) {
        self.cells[addr].set(value, ctx);
    }

    /// Copies one byte from `src` to `dst`, cell to cell.
    ///
    /// Logs a READ on the source's trace value, then a WRITE on the
    /// destination's, in that order; dumpers recording access order rely on
    /// read-before-write for transfers.
    ///
    /// # Panics
    ///
    /// Panics when either address is outside the table.
    pub fn copy(&mut self, dst: usize, src: usize, ctx: &mut AccessContext<'_>) {
        let value = self.read(src, ctx);
        self.write(dst, value, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessContext, AddressSpace, MemoryCell};
    use crate::diag::{AccessKind, BufferedDiag};
    use crate::trace::{AccessFlags, DumpManager, TraceValue};

    fn traced_ram(tracer: &mut DumpManager, name: &str) -> MemoryCell {
        let id = tracer.reg_trace(TraceValue::new(name, 8)).unwrap();
        tracer.value_mut(id).enable();
        MemoryCell::ram_traced(id)
    }

    #[test]
    fn fresh_space_is_fully_unmapped() {
        let mut tracer = DumpManager::new();
        let mut diag = BufferedDiag::new();
        let mut space = AddressSpace::new(0x10);

        let mut ctx = AccessContext {
            tracer: &mut tracer,
            diag: &mut diag,
            pc: 0x0100,
        };
        let _ = space.read(0x0F, &mut ctx);
        assert_eq!(diag.reports().len(), 1);
        assert_eq!(diag.reports()[0].cell, "INVALID.0x000F");
        assert_eq!(diag.reports()[0].kind, AccessKind::InvalidRead);
    }

    #[test]
    fn copy_logs_read_then_write() {
        let mut tracer = DumpManager::new();
        let src_cell = traced_ram(&mut tracer, "SRAM.SRC");
        let dst_cell = traced_ram(&mut tracer, "SRAM.DST");
        let src_id = src_cell.trace().unwrap();
        let dst_id = dst_cell.trace().unwrap();

        let mut space = AddressSpace::new(4);
        space.attach(0, src_cell);
        space.attach(1, dst_cell);

        let mut diag = BufferedDiag::new();
        let mut ctx = AccessContext {
            tracer: &mut tracer,
            diag: &mut diag,
            pc: 0,
        };
        space.write(0, 0x77, &mut ctx);
        space.copy(1, 0, &mut ctx);

        assert!(ctx.tracer.value(src_id).flags().has_read());
        let dst_flags = ctx.tracer.value(dst_id).flags();
        assert!(dst_flags.has_write());
        assert!(dst_flags.has_change());
        assert_eq!(ctx.tracer.value(dst_id).value(), 0x77);
    }

    #[test]
    fn write_to_unmapped_hole_is_reported_and_discarded() {
        let mut tracer = DumpManager::new();
        let mut diag = BufferedDiag::new();
        let mut space = AddressSpace::new(0x10);
        space.attach(0x00, MemoryCell::ram());

        let mut ctx = AccessContext {
            tracer: &mut tracer,
            diag: &mut diag,
            pc: 0x0042,
        };
        space.write(0x08, 0xEE, &mut ctx);
        assert_eq!(diag.reports().len(), 1);
        assert_eq!(diag.reports()[0].value, Some(0xEE));
        assert_eq!(diag.reports()[0].pc, 0x0042);
    }

    #[test]
    fn accesses_without_trace_attachment_leave_flags_untouched() {
        let mut tracer = DumpManager::new();
        let id = tracer.reg_trace(TraceValue::new("UNRELATED", 8)).unwrap();
        tracer.value_mut(id).enable();

        let mut diag = BufferedDiag::new();
        let mut space = AddressSpace::new(2);
        space.attach(0, MemoryCell::ram());
        let mut ctx = AccessContext {
            tracer: &mut tracer,
            diag: &mut diag,
            pc: 0,
        };
        space.write(0, 1, &mut ctx);
        assert_eq!(ctx.tracer.value(id).flags(), AccessFlags::default());
    }
}
