use std::path::PathBuf;

use nix::errno::Errno;

/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The debuggee could not be spawned.
    #[error("failed to spawn {0}: {1}")]
    Spawn(PathBuf, std::io::Error),

    /// File open/read error.
    #[error("{0}: {1}")]
    File(PathBuf, std::io::Error),

    /// A line of the debuggee's memory map could not be parsed.
    #[error("malformed memory map line: {0:?}")]
    MalformedMapLine(String),

    /// No mapped module matches the debugged program.
    #[error("{} is not mapped in the debuggee", .0.display())]
    MainModuleNotFound(PathBuf),

    /// The debuggee did not stop as expected after being spawned.
    #[error("thread {thread_id}: unexpected state {state} after spawn")]
    UnexpectedStop {
        /// ID of the thread.
        thread_id: u64,

        /// Observed state.
        state: String,
    },

    /// A process-control primitive failed.
    #[error("{op} failed on thread {thread_id}: {source}")]
    Trace {
        /// Name of the failing primitive.
        op: &'static str,

        /// ID of the thread the primitive was applied to.
        thread_id: u64,

        /// Underlying OS error.
        source: Errno,
    },

    /// A breakpoint is already enabled at the given address.
    #[error("breakpoint already installed at {0:#x}")]
    BreakpointExists(u64),

    /// No breakpoint was installed at the given address.
    #[error("no breakpoint installed at {0:#x}")]
    BreakpointMissing(u64),
}

impl Error {
    /// Creates a process-control error.
    pub const fn trace(op: &'static str, thread_id: u64, source: Errno) -> Self {
        Self::Trace {
            op,
            thread_id,
            source,
        }
    }

    /// Returns whether this error comes from a process-control primitive.
    pub const fn is_trace(&self) -> bool {
        matches!(self, Self::Trace { .. })
    }

    /// Returns whether this error means the thread no longer exists.
    pub const fn is_vanished_thread(&self) -> bool {
        matches!(
            self,
            Self::Trace {
                source: Errno::ESRCH,
                ..
            }
        )
    }
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Error returned by [Session::run](crate::Session::run).
#[derive(thiserror::Error, Debug)]
pub enum SessionError<E> {
    /// A debugger error occurred.
    #[error(transparent)]
    Debugger(#[from] Error),

    /// An event handler error occurred.
    #[error("event handler: {0}")]
    Handler(E),
}
