//! Core status register as a plain bitmask with per-flag accessors.

use std::fmt;

use crate::memory::IoRegister;

/// `SREG` bit for carry.
pub const SREG_C: u8 = 1 << 0;
/// `SREG` bit for zero result.
pub const SREG_Z: u8 = 1 << 1;
/// `SREG` bit for negative result.
pub const SREG_N: u8 = 1 << 2;
/// `SREG` bit for two's-complement overflow.
pub const SREG_V: u8 = 1 << 3;
/// `SREG` bit for sign (`N ^ V`).
pub const SREG_S: u8 = 1 << 4;
/// `SREG` bit for half carry.
pub const SREG_H: u8 = 1 << 5;
/// `SREG` bit for bit copy storage.
pub const SREG_T: u8 = 1 << 6;
/// `SREG` bit for global interrupt enable.
pub const SREG_I: u8 = 1 << 7;

/// One named status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StatusFlag {
    /// Carry.
    C,
    /// Zero.
    Z,
    /// Negative.
    N,
    /// Overflow.
    V,
    /// Sign.
    S,
    /// Half carry.
    H,
    /// Bit copy storage.
    T,
    /// Global interrupt enable.
    I,
}

impl StatusFlag {
    /// Ordered list of all flags, from bit 0 upward.
    pub const ALL: [Self; 8] = [
        Self::C,
        Self::Z,
        Self::N,
        Self::V,
        Self::S,
        Self::H,
        Self::T,
        Self::I,
    ];

    /// Returns the bit mask for this flag.
    #[must_use]
    pub const fn mask(self) -> u8 {
        match self {
            Self::C => SREG_C,
            Self::Z => SREG_Z,
            Self::N => SREG_N,
            Self::V => SREG_V,
            Self::S => SREG_S,
            Self::H => SREG_H,
            Self::T => SREG_T,
            Self::I => SREG_I,
        }
    }

    const fn letter(self) -> char {
        match self {
            Self::C => 'C',
            Self::Z => 'Z',
            Self::N => 'N',
            Self::V => 'V',
            Self::S => 'S',
            Self::H => 'H',
            Self::T => 'T',
            Self::I => 'I',
        }
    }
}

/// The simulated core's status register.
///
/// A plain bitmask with explicit get/set-flag operations. Mapped into the
/// I/O space through a register-backed cell (conventionally traced as
/// `"CORE.SREG"`), so firmware and the execute loop observe the same byte.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StatusRegister {
    bits: u8,
}

impl StatusRegister {
    /// Creates a register with all flags cleared.
    #[must_use]
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    /// Creates a register from a raw byte.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self { bits }
    }

    /// Raw byte value.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.bits
    }

    /// True when `flag` is set.
    #[must_use]
    pub const fn flag(self, flag: StatusFlag) -> bool {
        self.bits & flag.mask() != 0
    }

    /// Sets or clears `flag`.
    #[allow(clippy::missing_const_for_fn)]
    pub fn set_flag(&mut self, flag: StatusFlag, on: bool) {
        if on {
            self.bits |= flag.mask();
        } else {
            self.bits &= !flag.mask();
        }
    }

    /// Replaces the whole byte.
    #[allow(clippy::missing_const_for_fn)]
    pub fn set_bits(&mut self, bits: u8) {
        self.bits = bits;
    }
}

impl fmt::Display for StatusRegister {
    /// Renders set flags as letters and cleared flags as dashes, MSB first:
    /// `I------C`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for flag in StatusFlag::ALL.iter().rev() {
            let symbol = if self.flag(*flag) { flag.letter() } else { '-' };
            write!(f, "{symbol}")?;
        }
        Ok(())
    }
}

impl IoRegister for StatusRegister {
    fn read(&mut self) -> u8 {
        self.bits
    }

    fn write(&mut self, value: u8) {
        self.bits = value;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{StatusFlag, StatusRegister, SREG_C, SREG_I};
    use crate::diag::BufferedDiag;
    use crate::memory::{AccessContext, AddressSpace, MemoryCell};
    use crate::trace::{DumpManager, TraceValue};

    #[test]
    fn flags_set_and_clear_independently() {
        let mut sreg = StatusRegister::new();
        sreg.set_flag(StatusFlag::I, true);
        sreg.set_flag(StatusFlag::C, true);
        assert_eq!(sreg.bits(), SREG_I | SREG_C);

        sreg.set_flag(StatusFlag::C, false);
        assert!(sreg.flag(StatusFlag::I));
        assert!(!sreg.flag(StatusFlag::C));
    }

    #[test]
    fn display_renders_msb_first() {
        let sreg = StatusRegister::from_bits(SREG_I | SREG_C);
        assert_eq!(sreg.to_string(), "I------C");
        assert_eq!(StatusRegister::new().to_string(), "--------");
    }

    #[test]
    fn sreg_maps_into_the_address_space_as_a_register_cell() {
        let sreg = Rc::new(RefCell::new(StatusRegister::new()));

        let mut tracer = DumpManager::new();
        let id = tracer.reg_trace(TraceValue::new("CORE.SREG", 8)).unwrap();
        tracer.value_mut(id).enable();

        let mut space = AddressSpace::new(0x60);
        space.attach(
            0x5F,
            MemoryCell::register_traced(Box::new(Rc::clone(&sreg)), id),
        );

        let mut diag = BufferedDiag::new();
        let mut ctx = AccessContext {
            tracer: &mut tracer,
            diag: &mut diag,
            pc: 0,
        };
        space.write(0x5F, SREG_I, &mut ctx);

        // The CPU-side handle and the bus-visible byte agree.
        assert!(sreg.borrow().flag(StatusFlag::I));
        assert_eq!(space.read(0x5F, &mut ctx), SREG_I);
        assert_eq!(ctx.tracer.value(id).value(), u32::from(SREG_I));
    }
}
