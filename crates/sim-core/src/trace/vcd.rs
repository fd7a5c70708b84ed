//! Value-change-dump (VCD) waveform dumper.

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

use crate::error::SinkError;
use crate::trace::dumper::Dumper;
use crate::trace::value::{TraceId, TraceValue};

/// Configuration for a [`VcdDumper`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct VcdConfig {
    /// Time-scale unit written to the file header (`1<timescale>`).
    pub timescale: String,
    /// Emit a one-bit `<name>_R` pulse line for every read access.
    pub read_strobes: bool,
    /// Emit a one-bit `<name>_W` pulse line for every write access.
    pub write_strobes: bool,
}

impl Default for VcdConfig {
    fn default() -> Self {
        Self {
            timescale: "ns".to_owned(),
            read_strobes: false,
            write_strobes: false,
        }
    }
}

#[derive(Debug)]
struct Signal {
    name: String,
    bits: u8,
    initial: u32,
    code: String,
    read_code: Option<String>,
    write_code: Option<String>,
}

/// Dumper producing a VCD waveform file on any [`Write`] target.
///
/// Signal identifiers are assigned when the manager hands over the active
/// set and stay stable for the whole run. Mid-run output errors are latched
/// and surfaced once at [`stop`]; the per-cycle path never fails.
///
/// [`stop`]: Dumper::stop
#[derive(Debug)]
pub struct VcdDumper<W: Write> {
    out: W,
    config: VcdConfig,
    filter: Option<HashSet<String>>,
    signals: Vec<Signal>,
    index: HashMap<TraceId, usize>,
    marked: Vec<String>,
    time: u64,
    failed: Option<io::Error>,
}

impl<W: Write> VcdDumper<W> {
    /// Creates a dumper with default configuration (ns scale, no strobes).
    #[must_use]
    pub fn new(out: W) -> Self {
        Self::with_config(out, VcdConfig::default())
    }

    /// Creates a dumper with an explicit configuration.
    #[must_use]
    pub fn with_config(out: W, config: VcdConfig) -> Self {
        Self {
            out,
            config,
            filter: None,
            signals: Vec::new(),
            index: HashMap::new(),
            marked: Vec::new(),
            time: 0,
            failed: None,
        }
    }

    /// Restricts this dumper to the given fully-qualified signal names.
    ///
    /// Without a filter the dumper accepts every value offered to it.
    #[must_use]
    pub fn filter_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    fn emit(&mut self, text: &str) {
        if self.failed.is_some() {
            return;
        }
        if let Err(err) = self.out.write_all(text.as_bytes()) {
            self.failed = Some(err);
        }
    }

    fn value_record(signal: &Signal, value: u32) -> String {
        if signal.bits == 1 {
            format!("{}{}\n", value & 1, signal.code)
        } else {
            format!("b{:b} {}\n", value, signal.code)
        }
    }

    // VCD identifier codes use the printable range '!'..='~'.
    fn identifier(mut n: usize) -> String {
        let mut code = String::new();
        loop {
            let digit = u8::try_from(n % 94).unwrap_or(0);
            code.push(char::from(b'!' + digit));
            n /= 94;
            if n == 0 {
                break;
            }
        }
        code
    }
}

impl<W: Write> Dumper for VcdDumper<W> {
    fn wants(&self, tv: &TraceValue) -> bool {
        self.filter
            .as_ref()
            .is_none_or(|names| names.contains(tv.name()))
    }

    fn set_active_signals(&mut self, signals: &[(TraceId, &TraceValue)]) {
        self.signals.clear();
        self.index.clear();
        let mut next = 0_usize;
        let mut alloc = |next: &mut usize| {
            let code = Self::identifier(*next);
            *next += 1;
            code
        };

        for (slot, (id, tv)) in signals.iter().enumerate() {
            let code = alloc(&mut next);
            let read_code = self.config.read_strobes.then(|| alloc(&mut next));
            let write_code = self.config.write_strobes.then(|| alloc(&mut next));
            self.signals.push(Signal {
                name: tv.name().to_owned(),
                bits: tv.bits(),
                initial: tv.value(),
                code,
                read_code,
                write_code,
            });
            self.index.insert(*id, slot);
        }
    }

    fn start(&mut self) -> Result<(), SinkError> {
        let mut header = format!("$timescale 1{} $end\n", self.config.timescale);
        header.push_str("$scope module sim $end\n");
        for signal in &self.signals {
            header.push_str(&format!(
                "$var wire {} {} {} $end\n",
                signal.bits, signal.code, signal.name
            ));
            if let Some(code) = &signal.read_code {
                header.push_str(&format!("$var wire 1 {} {}_R $end\n", code, signal.name));
            }
            if let Some(code) = &signal.write_code {
                header.push_str(&format!("$var wire 1 {} {}_W $end\n", code, signal.name));
            }
        }
        header.push_str("$upscope $end\n$enddefinitions $end\n$dumpvars\n");
        for signal in &self.signals {
            header.push_str(&Self::value_record(signal, signal.initial));
            if let Some(code) = &signal.read_code {
                header.push_str(&format!("0{code}\n"));
            }
            if let Some(code) = &signal.write_code {
                header.push_str(&format!("0{code}\n"));
            }
        }
        header.push_str("$end\n");

        self.emit(&header);
        match self.failed.take() {
            Some(err) => Err(SinkError::Io(err)),
            None => Ok(()),
        }
    }

    fn stop(&mut self) -> Result<(), SinkError> {
        if let Some(err) = self.failed.take() {
            return Err(SinkError::Io(err));
        }
        self.out.flush()?;
        Ok(())
    }

    fn cycle(&mut self) {
        self.time += 1;
        let mut block = format!("#{}\n", self.time);
        for code in std::mem::take(&mut self.marked) {
            block.push_str(&format!("0{code}\n"));
        }
        self.emit(&block);
    }

    fn mark_read(&mut self, id: TraceId, _tv: &TraceValue) {
        if !self.config.read_strobes {
            return;
        }
        if let Some(&slot) = self.index.get(&id) {
            if let Some(code) = self.signals[slot].read_code.clone() {
                self.emit(&format!("1{code}\n"));
                self.marked.push(code);
            }
        }
    }

    fn mark_read_unknown(&mut self, id: TraceId, tv: &TraceValue) {
        // An unknown read still pulses the read strobe.
        self.mark_read(id, tv);
    }

    fn mark_write(&mut self, id: TraceId, _tv: &TraceValue) {
        if !self.config.write_strobes {
            return;
        }
        if let Some(&slot) = self.index.get(&id) {
            if let Some(code) = self.signals[slot].write_code.clone() {
                self.emit(&format!("1{code}\n"));
                self.marked.push(code);
            }
        }
    }

    fn mark_change(&mut self, id: TraceId, tv: &TraceValue) {
        if let Some(&slot) = self.index.get(&id) {
            let record = Self::value_record(&self.signals[slot], tv.value());
            self.emit(&record);
        }
    }
}
