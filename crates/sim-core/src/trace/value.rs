//! Named instrumented state holders with access-flag bookkeeping.

use std::cell::Cell;
use std::rc::Rc;

/// Maximum supported trace-value width in bits.
pub const MAX_TRACE_BITS: u8 = 32;

/// Stable handle to a [`TraceValue`] inside one [`DumpManager`] registry.
///
/// Cells and peripherals hold handles instead of owning the value, so the
/// registry remains the single lifetime anchor for all traced state.
///
/// [`DumpManager`]: crate::trace::DumpManager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceId(pub(crate) usize);

impl TraceId {
    /// Returns the registry slot index behind this handle.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Access flags accumulated on a trace value since the last dump.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AccessFlags(u8);

impl AccessFlags {
    /// Flag set with only the read bit.
    pub const READ: Self = Self(1 << 0);
    /// Flag set with only the write bit.
    pub const WRITE: Self = Self(1 << 1);
    /// Flag set with only the change bit.
    pub const CHANGE: Self = Self(1 << 2);

    /// True if any access has been logged.
    #[must_use]
    pub const fn any(self) -> bool {
        self.0 != 0
    }

    /// True if a read access has been logged.
    #[must_use]
    pub const fn has_read(self) -> bool {
        self.0 & Self::READ.0 != 0
    }

    /// True if a write access has been logged.
    #[must_use]
    pub const fn has_write(self) -> bool {
        self.0 & Self::WRITE.0 != 0
    }

    /// True if the value changed since the last dump.
    #[must_use]
    pub const fn has_change(self) -> bool {
        self.0 & Self::CHANGE.0 != 0
    }
}

impl std::ops::BitOr for AccessFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for AccessFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// Shared observation handle for shadow-mode change detection.
///
/// The owning peripheral keeps one clone and updates it whenever its hidden
/// state changes; the trace value keeps the other and diffs it once per
/// cycle. This replaces accessor interception for state that changes outside
/// any `get`/`set` path (double-buffered timer registers and the like).
#[derive(Debug, Clone, Default)]
pub struct ShadowHandle(Rc<Cell<u32>>);

impl ShadowHandle {
    /// Creates a handle with the given initial state.
    #[must_use]
    pub fn new(initial: u32) -> Self {
        Self(Rc::new(Cell::new(initial)))
    }

    /// Publishes a new state for the next per-cycle diff.
    pub fn set(&self, value: u32) {
        self.0.set(value);
    }

    /// Returns the currently published state.
    #[must_use]
    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

/// A named, width-bounded state holder whose accesses and changes can be
/// observed by dumpers.
///
/// Explicit mode: the owning cell or peripheral calls [`write`]/[`read`] for
/// every access. Shadow mode: the value holds a [`ShadowHandle`] and detects
/// changes by diffing once per cycle; read/write flags are unavailable there.
/// The two modes are mutually exclusive per instance.
///
/// [`write`]: TraceValue::write
/// [`read`]: TraceValue::read
#[derive(Debug)]
pub struct TraceValue {
    name: String,
    index: Option<usize>,
    bits: u8,
    value: u32,
    flags: AccessFlags,
    written: bool,
    enabled: bool,
    shadow: Option<ShadowHandle>,
}

impl TraceValue {
    /// Creates an explicit-mode trace value of the given width.
    ///
    /// # Panics
    ///
    /// Panics when `bits` is outside `1..=32`; widths are fixed at device
    /// construction and a bad width is a build-time bug.
    #[must_use]
    pub fn new(name: &str, bits: u8) -> Self {
        assert!(
            (1..=MAX_TRACE_BITS).contains(&bits),
            "trace value '{name}': width {bits} outside 1..=32"
        );
        Self {
            name: name.to_owned(),
            index: None,
            bits,
            value: 0,
            flags: AccessFlags::default(),
            written: false,
            enabled: false,
            shadow: None,
        }
    }

    /// Creates an explicit-mode value that is part of an array or bank.
    ///
    /// The index is appended to the qualified name, so `("SRAM", 3)` becomes
    /// `SRAM3` and stays unique within the registry.
    ///
    /// # Panics
    ///
    /// Panics when `bits` is outside `1..=32`.
    #[must_use]
    pub fn indexed(name: &str, bits: u8, index: usize) -> Self {
        let mut tv = Self::new(&format!("{name}{index}"), bits);
        tv.index = Some(index);
        tv
    }

    /// Creates a shadow-mode value diffed against `shadow` once per cycle.
    ///
    /// # Panics
    ///
    /// Panics when `bits` is outside `1..=32`.
    #[must_use]
    pub fn shadowed(name: &str, bits: u8, shadow: ShadowHandle) -> Self {
        let mut tv = Self::new(name, bits);
        tv.value = shadow.get() & tv.mask();
        tv.shadow = Some(shadow);
        tv
    }

    /// Fully-qualified name, including the index suffix when present.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of this value in a memory field or bank, when it has one.
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    /// Width of this value in bits (`1..=32`).
    #[must_use]
    pub const fn bits(&self) -> u8 {
        self.bits
    }

    /// Last value seen by the trace path.
    ///
    /// For shadow-mode values this lags the underlying state until the next
    /// per-cycle diff.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }

    /// Flags accumulated since the last dump.
    #[must_use]
    pub const fn flags(&self) -> AccessFlags {
        self.flags
    }

    /// True once any write has been logged, for the rest of the run.
    #[must_use]
    pub const fn written(&self) -> bool {
        self.written
    }

    /// Marks the value as initialized without logging an access.
    ///
    /// Used for I/O registers with a hardware reset value, so the first read
    /// after reset is not flagged as a read of unknown state.
    pub fn set_written(&mut self) {
        self.written = true;
    }

    /// True when access logging is active for this value.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enables access logging. Idempotent.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Disables access logging again.
    ///
    /// The dump manager never calls this mid-run; it exists for hosts that
    /// tear tracing down between runs.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// True when this value uses shadow-mode change detection.
    #[must_use]
    pub const fn is_shadowed(&self) -> bool {
        self.shadow.is_some()
    }

    /// Logs a write access of `val`.
    ///
    /// Sets the WRITE flag, sets CHANGE when the stored value differs, and
    /// marks the value written for the rest of the run. No-op when disabled.
    pub fn write(&mut self, val: u32) {
        if !self.enabled {
            return;
        }
        let masked = val & self.mask();
        self.flags |= AccessFlags::WRITE;
        if masked != self.value {
            self.flags |= AccessFlags::CHANGE;
        }
        self.value = masked;
        self.written = true;
    }

    /// Logs a read access. No-op when disabled.
    pub fn read(&mut self) {
        if !self.enabled {
            return;
        }
        self.flags |= AccessFlags::READ;
    }

    /// Diffs the shadowed state against the last seen value.
    ///
    /// Sets CHANGE and catches up when they differ. No-op when disabled or in
    /// explicit mode.
    pub fn cycle(&mut self) {
        if !self.enabled {
            return;
        }
        if let Some(shadow) = &self.shadow {
            let current = shadow.get() & self.mask();
            if current != self.value {
                self.flags |= AccessFlags::CHANGE;
                self.value = current;
            }
        }
    }

    /// Clears the accumulated flags; only the dump path calls this, after all
    /// observing dumpers have been notified.
    pub(crate) fn clear_flags(&mut self) {
        self.flags = AccessFlags::default();
    }

    const fn mask(&self) -> u32 {
        if self.bits == MAX_TRACE_BITS {
            u32::MAX
        } else {
            (1 << self.bits) - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessFlags, ShadowHandle, TraceValue};

    fn enabled_value(bits: u8) -> TraceValue {
        let mut tv = TraceValue::new("TEST.V", bits);
        tv.enable();
        tv
    }

    #[test]
    fn write_then_read_accumulates_both_flags() {
        let mut tv = enabled_value(8);
        tv.write(0x5A);
        tv.read();
        assert!(tv.flags().has_read());
        assert!(tv.flags().has_write());
        assert!(tv.flags().has_change());
        assert_eq!(tv.value(), 0x5A);
    }

    #[test]
    fn rewriting_the_same_value_sets_write_but_not_change() {
        let mut tv = enabled_value(8);
        tv.write(0x10);
        tv.clear_flags();
        tv.write(0x10);
        assert!(tv.flags().has_write());
        assert!(!tv.flags().has_change());
    }

    #[test]
    fn written_is_sticky_across_clears_and_rewrites() {
        let mut tv = enabled_value(8);
        assert!(!tv.written());
        tv.write(0);
        tv.clear_flags();
        tv.write(0);
        assert!(tv.written());
    }

    #[test]
    fn disabled_value_ignores_all_accesses() {
        let mut tv = TraceValue::new("TEST.OFF", 8);
        tv.write(0xFF);
        tv.read();
        tv.cycle();
        assert!(!tv.flags().any());
        assert!(!tv.written());
        assert_eq!(tv.value(), 0);
    }

    #[test]
    fn values_are_masked_to_their_width() {
        let mut tv = enabled_value(4);
        tv.write(0xFF);
        assert_eq!(tv.value(), 0x0F);

        let mut wide = enabled_value(32);
        wide.write(u32::MAX);
        assert_eq!(wide.value(), u32::MAX);
    }

    #[test]
    fn shadow_diff_fires_once_per_mutation() {
        let shadow = ShadowHandle::new(0);
        let mut tv = TraceValue::shadowed("TIMER0.BUF", 16, shadow.clone());
        tv.enable();

        shadow.set(0x1234);
        tv.cycle();
        assert!(tv.flags().has_change());
        assert_eq!(tv.value(), 0x1234);

        tv.clear_flags();
        tv.cycle();
        assert!(!tv.flags().has_change());
    }

    #[test]
    fn indexed_values_append_their_index_to_the_name() {
        let tv = TraceValue::indexed("SRAM", 8, 3);
        assert_eq!(tv.name(), "SRAM3");
        assert_eq!(tv.index(), Some(3));
    }

    #[test]
    fn set_written_marks_reset_initialized_registers() {
        let mut tv = enabled_value(8);
        tv.set_written();
        assert!(tv.written());
        assert!(!tv.flags().any());
    }

    #[test]
    fn flag_set_operations_compose() {
        let flags = AccessFlags::READ | AccessFlags::CHANGE;
        assert!(flags.has_read());
        assert!(!flags.has_write());
        assert!(flags.has_change());
        assert!(flags.any());
    }

    #[test]
    #[should_panic(expected = "width 0 outside 1..=32")]
    fn zero_width_is_a_construction_bug() {
        let _ = TraceValue::new("BAD", 0);
    }
}
