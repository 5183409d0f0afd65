use nix::libc::c_long;
use nix::sys::ptrace;
use nix::unistd::Pid;

/// Reads a machine word from the memory of the given thread.
pub fn read_word(pid: Pid, addr: u64) -> crate::Result<u64> {
    ptrace::read(pid, addr as ptrace::AddressType)
        .map(|word| word as u64)
        .map_err(|e| crate::Error::trace("ptrace(PTRACE_PEEKDATA)", pid.as_raw() as u64, e))
}

/// Writes a machine word into the memory of the given thread.
pub fn write_word(pid: Pid, addr: u64, word: u64) -> crate::Result<()> {
    ptrace::write(pid, addr as ptrace::AddressType, word as c_long)
        .map_err(|e| crate::Error::trace("ptrace(PTRACE_POKEDATA)", pid.as_raw() as u64, e))
}
