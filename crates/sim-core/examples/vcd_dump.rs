//! Wires a minimal timer device into the trace subsystem and prints the
//! resulting VCD waveform to stdout.

use std::cell::RefCell;
use std::rc::Rc;

use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use sim_core::{
    AccessContext, AddressSpace, BufferedDiag, DumpManager, IoRegister, MemoryCell, ShadowHandle,
    TraceValue, VcdConfig, VcdDumper, WarnUnknown,
};

/// Free-running 8-bit counter with a hidden compare double buffer.
struct Timer {
    count: u8,
    compare_buffer: ShadowHandle,
}

impl Timer {
    fn tick(&mut self) {
        self.count = self.count.wrapping_add(1);
        // The double buffer latches every 8 counts, outside any bus access.
        if self.count % 8 == 0 {
            self.compare_buffer.set(u32::from(self.count));
        }
    }
}

impl IoRegister for Timer {
    fn read(&mut self) -> u8 {
        self.count
    }

    fn write(&mut self, value: u8) {
        self.count = value;
    }
}

fn main() {
    let mut tracer = DumpManager::new();
    let mut space = AddressSpace::new(0x60);

    let compare_buffer = ShadowHandle::new(0);
    let timer = Rc::new(RefCell::new(Timer {
        count: 0,
        compare_buffer: compare_buffer.clone(),
    }));

    let tcnt = tracer
        .reg_trace(TraceValue::new("TIMER0.TCNT", 8))
        .expect("fresh registry");
    let ocrbuf = tracer
        .shadow_u8("TIMER0.OCRBUF", compare_buffer)
        .expect("fresh registry");
    space.attach(
        0x52,
        MemoryCell::register_traced(Box::new(Rc::clone(&timer)), tcnt),
    );

    let config = VcdConfig {
        read_strobes: true,
        ..VcdConfig::default()
    };
    tracer.add_dumper(
        Box::new(VcdDumper::with_config(std::io::stdout(), config)),
        &[tcnt, ocrbuf],
    );
    tracer.add_dumper(Box::new(WarnUnknown::new()), &[tcnt, ocrbuf]);
    tracer.start();

    let mut diag = BufferedDiag::new();
    for cycle in 0..32_u32 {
        timer.borrow_mut().tick();

        // Firmware polls TCNT every fourth cycle.
        if cycle % 4 == 0 {
            let mut ctx = AccessContext {
                tracer: &mut tracer,
                diag: &mut diag,
                pc: cycle * 2,
            };
            let _ = space.read(0x52, &mut ctx);
        }

        tracer.cycle();
    }
    tracer.stop();
}
