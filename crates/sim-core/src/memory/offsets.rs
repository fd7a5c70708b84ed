//! Base-offset remapping of external address ranges onto the backing table.

use crate::memory::{AccessContext, AddressSpace};

/// Maps a contiguous external address range onto the shared cell table.
///
/// Lets several logical regions (register file, I/O space, extended I/O,
/// SRAM) be composed from one physical backing array. Pure routing: windows
/// log nothing themselves. Read-only after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetWindow {
    base: usize,
    len: usize,
}

impl OffsetWindow {
    /// Creates a window of `len` cells starting at `base` in the backing
    /// table.
    #[must_use]
    pub const fn new(base: usize, len: usize) -> Self {
        Self { base, len }
    }

    /// Base offset into the backing table.
    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    /// Number of external offsets this window exposes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True when the window exposes no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Translates an external offset into a backing-table index.
    ///
    /// # Panics
    ///
    /// Panics when `external` is outside the window. Windows are fixed at
    /// device construction, so an out-of-range offset is a programming error
    /// in the caller, not a runtime simulation condition.
    #[must_use]
    pub fn resolve(&self, external: usize) -> usize {
        assert!(
            external < self.len,
            "offset 0x{external:04X} outside window (base=0x{:04X}, len=0x{:04X})",
            self.base,
            self.len
        );
        self.base + external
    }

    /// Reads the cell at `external` through this window.
    pub fn read(
        &self,
        space: &mut AddressSpace,
        external: usize,
        ctx: &mut AccessContext<'_>,
    ) -> u8 {
        space.read(self.resolve(external), ctx)
    }

    /// Writes the cell at `external` through this window.
    pub fn write(
        &self,
        space: &mut AddressSpace,
        external: usize,
        value: u8,
        ctx: &mut AccessContext<'_>,
    ) {
        space.write(self.resolve(external), value, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::OffsetWindow;
    use crate::diag::BufferedDiag;
    use crate::memory::{AccessContext, AddressSpace, MemoryCell};
    use crate::trace::DumpManager;

    #[test]
    fn resolve_applies_the_base_offset() {
        let window = OffsetWindow::new(0x20, 0x40);
        assert_eq!(window.resolve(0x00), 0x20);
        assert_eq!(window.resolve(0x3F), 0x5F);
    }

    #[test]
    #[should_panic(expected = "outside window")]
    fn out_of_range_offset_is_fatal() {
        let window = OffsetWindow::new(0x20, 0x40);
        let _ = window.resolve(0x40);
    }

    #[test]
    fn two_windows_share_one_backing_table() {
        let mut tracer = DumpManager::new();
        let mut diag = BufferedDiag::new();
        let mut space = AddressSpace::new(0x100);
        space.attach(0x60, MemoryCell::ram());

        // I/O space at 0x20 and data space at 0x00 both see address 0x60.
        let data = OffsetWindow::new(0x00, 0x100);
        let io = OffsetWindow::new(0x20, 0xE0);

        let mut ctx = AccessContext {
            tracer: &mut tracer,
            diag: &mut diag,
            pc: 0,
        };
        io.write(&mut space, 0x40, 0x5A, &mut ctx);
        assert_eq!(data.read(&mut space, 0x60, &mut ctx), 0x5A);
    }
}
