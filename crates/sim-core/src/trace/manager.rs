//! Run-scoped registry owning all trace values and active dumpers.

use std::collections::{HashMap, HashSet};
use std::io::{self, BufRead, Write};

use crate::error::TraceError;
use crate::trace::dumper::Dumper;
use crate::trace::value::{ShadowHandle, TraceId, TraceValue};

struct DumperSlot {
    dumper: Box<dyn Dumper>,
    observed: HashSet<TraceId>,
}

/// Outcome of loading a persisted trace-name selection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Handles for every listed name that is registered, in file order.
    pub found: Vec<TraceId>,
    /// Listed names that are not registered and were skipped.
    pub skipped: Vec<String>,
}

/// Registry owning all traceable values and dumpers of one simulated device.
///
/// The execute loop drives it with exactly one [`cycle`] call per simulated
/// clock, strictly after all peripheral state updates for that cycle. Cells
/// and peripherals log accesses through [`log_read`]/[`log_write`] using the
/// [`TraceId`] handed out at registration.
///
/// [`cycle`]: DumpManager::cycle
/// [`log_read`]: DumpManager::log_read
/// [`log_write`]: DumpManager::log_write
#[derive(Default)]
pub struct DumpManager {
    values: Vec<TraceValue>,
    names: HashMap<String, TraceId>,
    active: Vec<TraceId>,
    dumpers: Vec<DumperSlot>,
    started: bool,
}

impl DumpManager {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a traceable value; does not make it active.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::DuplicateName`] when a value with the same
    /// fully-qualified name is already registered. Names are the identity
    /// used by persisted selections and waveform output, so a collision is a
    /// peripheral-model bug and must not silently overwrite.
    pub fn reg_trace(&mut self, tv: TraceValue) -> Result<TraceId, TraceError> {
        if self.names.contains_key(tv.name()) {
            return Err(TraceError::DuplicateName(tv.name().to_owned()));
        }
        let id = TraceId(self.values.len());
        self.names.insert(tv.name().to_owned(), id);
        self.values.push(tv);
        Ok(id)
    }

    /// Registers a shadow-mode value diffed against `shadow` every cycle.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::DuplicateName`] on a name collision.
    pub fn reg_shadow(
        &mut self,
        name: &str,
        bits: u8,
        shadow: ShadowHandle,
    ) -> Result<TraceId, TraceError> {
        self.reg_trace(TraceValue::shadowed(name, bits, shadow))
    }

    /// Registers a shadow-traced boolean signal.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::DuplicateName`] on a name collision.
    pub fn shadow_bool(&mut self, name: &str, shadow: ShadowHandle) -> Result<TraceId, TraceError> {
        self.reg_shadow(name, 1, shadow)
    }

    /// Registers a shadow-traced byte value.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::DuplicateName`] on a name collision.
    pub fn shadow_u8(&mut self, name: &str, shadow: ShadowHandle) -> Result<TraceId, TraceError> {
        self.reg_shadow(name, 8, shadow)
    }

    /// Registers a shadow-traced 16-bit value.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::DuplicateName`] on a name collision.
    pub fn shadow_u16(&mut self, name: &str, shadow: ShadowHandle) -> Result<TraceId, TraceError> {
        self.reg_shadow(name, 16, shadow)
    }

    /// Registers a shadow-traced 32-bit value.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::DuplicateName`] on a name collision.
    pub fn shadow_u32(&mut self, name: &str, shadow: ShadowHandle) -> Result<TraceId, TraceError> {
        self.reg_shadow(name, 32, shadow)
    }

    /// Looks up a registered value by fully-qualified name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<TraceId> {
        self.names.get(name).copied()
    }

    /// Returns the value behind a handle.
    #[must_use]
    pub fn value(&self, id: TraceId) -> &TraceValue {
        &self.values[id.0]
    }

    /// Mutable access to the value behind a handle.
    ///
    /// Peripherals use this at build time, e.g. to call
    /// [`TraceValue::set_written`] for reset-initialized registers.
    pub fn value_mut(&mut self, id: TraceId) -> &mut TraceValue {
        &mut self.values[id.0]
    }

    /// Handles of every registered value, in registration order.
    #[must_use]
    pub fn all(&self) -> Vec<TraceId> {
        (0..self.values.len()).map(TraceId).collect()
    }

    /// Handles currently observed by at least one dumper, ascending.
    #[must_use]
    pub fn active(&self) -> &[TraceId] {
        &self.active
    }

    /// Logs a read access on the value behind `id`.
    pub fn log_read(&mut self, id: TraceId) {
        self.values[id.0].read();
    }

    /// Logs a write access of `value` on the value behind `id`.
    pub fn log_write(&mut self, id: TraceId, value: u32) {
        self.values[id.0].write(value);
    }

    /// Adds a dumper together with the subset of values it should observe.
    ///
    /// The subset is filtered through the dumper's [`Dumper::wants`]
    /// predicate; surviving values are enabled, joined into the active set,
    /// and handed to the dumper as its signal list. Each dumper only ever
    /// sees its own subset, so dumpers with different scopes do not see each
    /// other's signals.
    pub fn add_dumper(&mut self, mut dumper: Box<dyn Dumper>, interest: &[TraceId]) {
        let mut observed: Vec<TraceId> = interest
            .iter()
            .copied()
            .filter(|id| dumper.wants(&self.values[id.0]))
            .collect();
        observed.sort_unstable();
        observed.dedup();

        for &id in &observed {
            self.values[id.0].enable();
            if !self.active.contains(&id) {
                self.active.push(id);
            }
        }
        self.active.sort_unstable();

        let signals: Vec<(TraceId, &TraceValue)> = observed
            .iter()
            .map(|&id| (id, &self.values[id.0]))
            .collect();
        dumper.set_active_signals(&signals);

        self.dumpers.push(DumperSlot {
            dumper,
            observed: observed.into_iter().collect(),
        });
    }

    /// Starts every dumper, in registration order.
    ///
    /// A failing sink is reported and skipped; it does not prevent the other
    /// dumpers from starting or from receiving cycle events.
    pub fn start(&mut self) {
        self.started = true;
        for (slot_index, slot) in self.dumpers.iter_mut().enumerate() {
            if let Err(err) = slot.dumper.start() {
                log::warn!("dumper #{slot_index} failed to start: {err}");
            }
        }
    }

    /// Processes one simulated clock cycle.
    ///
    /// Order is fixed: shadow-mode diffing for active values, then every
    /// dumper's cycle hook, then per-value event dispatch. A value's flags
    /// are cleared only after all observing dumpers saw them, so no dumper
    /// loses an event to another dumper's clear.
    pub fn cycle(&mut self) {
        for &id in &self.active {
            self.values[id.0].cycle();
        }
        for slot in &mut self.dumpers {
            slot.dumper.cycle();
        }
        for slot_index in 0..self.active.len() {
            let id = self.active[slot_index];
            let flags = self.values[id.0].flags();
            if flags.any() {
                let tv = &self.values[id.0];
                for slot in &mut self.dumpers {
                    if !slot.observed.contains(&id) {
                        continue;
                    }
                    if flags.has_read() {
                        if tv.written() {
                            slot.dumper.mark_read(id, tv);
                        } else {
                            slot.dumper.mark_read_unknown(id, tv);
                        }
                    }
                    if flags.has_write() {
                        slot.dumper.mark_write(id, tv);
                    }
                    if flags.has_change() {
                        slot.dumper.mark_change(id, tv);
                    }
                }
            }
            self.values[id.0].clear_flags();
        }
    }

    /// Stops every dumper, in registration order, flushing their output.
    ///
    /// Idempotent; also invoked from `Drop` so a run torn down at any cycle
    /// boundary still flushes deterministically. Sink failures are reported
    /// and do not stop the remaining dumpers.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        for (slot_index, slot) in self.dumpers.iter_mut().enumerate() {
            if let Err(err) = slot.dumper.stop() {
                log::warn!("dumper #{slot_index} failed to stop: {err}");
            }
        }
    }

    /// Writes the fully-qualified names of `subset`, one per line.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the stream cannot be written.
    pub fn save<W: Write>(&self, out: &mut W, subset: &[TraceId]) -> io::Result<()> {
        for &id in subset {
            writeln!(out, "{}", self.values[id.0].name())?;
        }
        Ok(())
    }

    /// Reads a newline-delimited name listing produced by [`save`].
    ///
    /// Unknown names are reported through the `log` facade and skipped; the
    /// remaining names still resolve. Blank lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the stream cannot be read.
    ///
    /// [`save`]: DumpManager::save
    pub fn load<R: BufRead>(&self, input: R) -> io::Result<LoadOutcome> {
        let mut outcome = LoadOutcome::default();
        for line in input.lines() {
            let line = line?;
            let name = line.trim();
            if name.is_empty() {
                continue;
            }
            if let Some(id) = self.lookup(name) {
                outcome.found.push(id);
            } else {
                log::warn!("unknown trace value '{name}' in selection, skipping");
                outcome.skipped.push(name.to_owned());
            }
        }
        Ok(outcome)
    }
}

impl Drop for DumpManager {
    fn drop(&mut self) {
        self.stop();
    }
}
