mod controller;
mod maps;
mod mem;
mod process;
mod regs;

use std::fmt;

use nix::sys::signal::Signal;

pub use self::controller::LinuxController;
pub use self::maps::build_module_registry;
pub use self::process::{TracedProcessHandle, spawn_debuggee};
pub use self::regs::Registers;

/// Signal which stopped or terminated a traced thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Exception(pub Signal);

impl Exception {
    /// Returns whether the thread was stopped by a trap (breakpoint,
    /// single-step or tracing event).
    pub const fn is_trap(self) -> bool {
        matches!(self.0, Signal::SIGTRAP)
    }

    /// Returns the signal to deliver when resuming the thread.
    ///
    /// Traps and the `SIGSTOP` of new threads are caused by the tracing
    /// itself, so they are swallowed.
    pub const fn forwarded(self) -> Option<Self> {
        match self.0 {
            Signal::SIGTRAP | Signal::SIGSTOP => None,
            _ => Some(self),
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use nix::sys::signal::Signal;

    use super::Exception;

    #[test]
    fn forwarded_signals() {
        assert_eq!(Exception(Signal::SIGTRAP).forwarded(), None);
        assert_eq!(Exception(Signal::SIGSTOP).forwarded(), None);
        assert_eq!(
            Exception(Signal::SIGSEGV).forwarded(),
            Some(Exception(Signal::SIGSEGV))
        );
        assert_eq!(
            Exception(Signal::SIGCHLD).forwarded(),
            Some(Exception(Signal::SIGCHLD))
        );
    }

    #[test]
    fn display() {
        assert_eq!(Exception(Signal::SIGSEGV).to_string(), "SIGSEGV");
        assert!(Exception(Signal::SIGTRAP).is_trap());
        assert!(!Exception(Signal::SIGINT).is_trap());
    }
}
