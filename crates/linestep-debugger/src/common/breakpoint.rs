use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::control::TraceeMemory;

/// Trap instruction (`int3`).
pub const TRAP_OPCODE: u8 = 0xcc;

/// Software breakpoint patched into the debuggee's memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Breakpoint {
    /// ID of the thread used to access the memory.
    pub thread_id: u64,

    /// Address of the patched byte.
    pub addr: u64,

    saved_byte: u8,
    enabled: bool,
}

impl Breakpoint {
    /// Patches a trap instruction at the given address.
    ///
    /// Nothing is mutated if the memory cannot be read.
    pub fn install<M: TraceeMemory + ?Sized>(
        mem: &mut M,
        thread_id: u64,
        addr: u64,
    ) -> crate::Result<Self> {
        let word = mem.read_word(thread_id, addr)?;

        mem.write_word(thread_id, addr, splice_low_byte(word, TRAP_OPCODE))?;

        tracing::debug!(
            thread_id,
            addr = format_args!("{addr:#x}"),
            saved_byte = format_args!("{:#04x}", word as u8),
            "breakpoint installed"
        );

        Ok(Self {
            thread_id,
            addr,
            saved_byte: word as u8,
            enabled: true,
        })
    }

    /// Restores the original byte.
    ///
    /// The rest of the word is re-read, so bytes modified since the install
    /// are preserved.
    pub fn remove<M: TraceeMemory + ?Sized>(&mut self, mem: &mut M) -> crate::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let word = mem.read_word(self.thread_id, self.addr)?;

        mem.write_word(
            self.thread_id,
            self.addr,
            splice_low_byte(word, self.saved_byte),
        )?;

        self.enabled = false;

        tracing::debug!(addr = format_args!("{:#x}", self.addr), "breakpoint removed");

        Ok(())
    }

    /// Patches the trap instruction again after a [remove](Self::remove).
    pub fn enable<M: TraceeMemory + ?Sized>(&mut self, mem: &mut M) -> crate::Result<()> {
        if self.enabled {
            return Ok(());
        }

        let word = mem.read_word(self.thread_id, self.addr)?;

        mem.write_word(self.thread_id, self.addr, splice_low_byte(word, TRAP_OPCODE))?;

        self.saved_byte = word as u8;
        self.enabled = true;

        Ok(())
    }

    /// Returns whether the trap instruction is in place.
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the original byte at the breakpoint address.
    pub const fn saved_byte(&self) -> u8 {
        self.saved_byte
    }
}

fn splice_low_byte(word: u64, byte: u8) -> u64 {
    (word & !0xff) | u64::from(byte)
}

/// Breakpoints placed within the debuggee, by address.
#[derive(Debug, Default)]
pub struct BreakpointManager {
    bks: HashMap<u64, Breakpoint>,
}

impl BreakpointManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs (or re-enables) a breakpoint at the given address.
    ///
    /// Fails if an enabled breakpoint is already there, since installing it
    /// twice would lose the original byte.
    pub fn install<M: TraceeMemory + ?Sized>(
        &mut self,
        mem: &mut M,
        thread_id: u64,
        addr: u64,
    ) -> crate::Result<&Breakpoint> {
        match self.bks.entry(addr) {
            Entry::Occupied(e) if e.get().enabled() => Err(crate::Error::BreakpointExists(addr)),
            Entry::Occupied(e) => {
                let bk = e.into_mut();
                bk.enable(mem)?;
                Ok(bk)
            }
            Entry::Vacant(v) => {
                let bk = Breakpoint::install(mem, thread_id, addr)?;
                Ok(v.insert(bk))
            }
        }
    }

    /// Removes the breakpoint at the given address.
    pub fn remove<M: TraceeMemory + ?Sized>(&mut self, mem: &mut M, addr: u64) -> crate::Result<()> {
        self.bks
            .get_mut(&addr)
            .ok_or(crate::Error::BreakpointMissing(addr))?
            .remove(mem)
    }

    /// Returns the breakpoint at the given address.
    pub fn get(&self, addr: u64) -> Option<&Breakpoint> {
        self.bks.get(&addr)
    }
}
