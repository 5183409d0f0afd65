//! Translation between run-time addresses and module file offsets.
//!
//! The translation only depends on the module's [LinkageType] and load base.

use linestep_symbol::LinkageType;

use super::module::Module;

/// Translates a run-time address into an address as found in the module's
/// debug information.
pub const fn to_file_offset(linkage: LinkageType, load_base: u64, addr: u64) -> u64 {
    match linkage {
        LinkageType::PositionIndependent => addr.wrapping_sub(load_base),
        LinkageType::Executable | LinkageType::Other => addr,
    }
}

/// Translates an address found in the module's debug information into a
/// run-time address.
pub const fn to_absolute(linkage: LinkageType, load_base: u64, offset: u64) -> u64 {
    match linkage {
        LinkageType::PositionIndependent => offset.wrapping_add(load_base),
        LinkageType::Executable | LinkageType::Other => offset,
    }
}

impl Module {
    /// Translates a run-time address into a file offset of this module.
    pub const fn to_file_offset(&self, addr: u64) -> u64 {
        to_file_offset(self.linkage(), self.load_base(), addr)
    }

    /// Translates a file offset of this module into a run-time address.
    pub const fn to_absolute(&self, offset: u64) -> u64 {
        to_absolute(self.linkage(), self.load_base(), offset)
    }
}
