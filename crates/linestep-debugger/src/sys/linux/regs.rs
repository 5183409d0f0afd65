use std::fmt;

use nix::libc::user_regs_struct;

use crate::RegisterSnapshot;

/// General-purpose registers of a stopped thread.
#[derive(Clone, Copy)]
pub struct Registers(pub user_regs_struct);

impl RegisterSnapshot for Registers {
    fn instr_addr(&self) -> u64 {
        self.0.rip
    }

    fn set_instr_addr(&mut self, addr: u64) {
        self.0.rip = addr;
    }
}

impl fmt::Debug for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registers")
            .field("rip", &format_args!("{:#x}", self.0.rip))
            .field("rsp", &format_args!("{:#x}", self.0.rsp))
            .field("orig_rax", &self.0.orig_rax)
            .finish_non_exhaustive()
    }
}
