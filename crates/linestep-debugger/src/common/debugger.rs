use std::ffi::OsStr;
use std::path::Path;

use super::session::Session;
use crate::sys;

/// Local debugger.
///
/// # Note
///
/// Right now, only **Linux** `x86_64` is supported.
#[derive(Default)]
pub struct Debugger;

impl Debugger {
    /// Spawns the given program in debug-mode and returns the session which
    /// will drive it.
    ///
    /// The debuggee is killed if the session is dropped before its end.
    pub async fn spawn<I, S>(
        program: impl AsRef<Path>,
        args: I,
    ) -> crate::Result<Session<sys::LinuxController>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = program.as_ref();

        let program = tokio::fs::canonicalize(program)
            .await
            .map_err(|e| crate::Error::File(program.to_path_buf(), e))?;

        let debuggee = sys::spawn_debuggee(&program, args)?;

        let controller = sys::LinuxController::new(debuggee);

        let process_id = controller.process_id();

        Ok(Session::new(controller, process_id, program))
    }
}
