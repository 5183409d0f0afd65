use std::io::Write;

use linestep_debugger::{
    EventHandler, ExitStatus, LineEntry, LookupError, Module, ModuleRegistry, StepReport,
};
use linestep_symbol::LineRow;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::StepConfig;

/// Error returned by the [ConsoleHandler].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Failed to write a report.
    #[error("failed to write report")]
    Output(#[source] std::io::Error),

    /// Failed to read the operator's step input.
    #[error("failed to read step input")]
    Input(#[source] std::io::Error),
}

/// Event handler printing the session's reports to a writer.
///
/// In interactive mode, the handler waits for one line of input after each
/// resolved source line before letting the debuggee go on.
pub struct ConsoleHandler<W, R> {
    output: W,
    input: R,
    interactive: bool,
    report_missing: bool,
    show_modules: bool,
    dump_line_tables: bool,
}

impl<W: Write, R: AsyncBufRead + Unpin> ConsoleHandler<W, R> {
    /// Creates a new handler writing to `output` and gating steps on `input`.
    pub const fn new(config: &StepConfig, output: W, input: R) -> Self {
        Self {
            output,
            input,
            interactive: config.interactive,
            report_missing: config.report_missing,
            show_modules: config.show_modules,
            dump_line_tables: config.dump_line_tables,
        }
    }

    /// Returns whether the handler still waits for input between steps.
    pub const fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Consumes the handler and returns its writer.
    pub fn into_output(self) -> W {
        self.output
    }

    async fn wait_for_step(&mut self) -> Result<(), Error> {
        self.output.flush().map_err(Error::Output)?;

        if !self.interactive {
            return Ok(());
        }

        let mut line = String::new();

        let read = self
            .input
            .read_line(&mut line)
            .await
            .map_err(Error::Input)?;

        if read == 0 {
            tracing::debug!("step input closed, stepping non-interactively");
            self.interactive = false;
        }

        Ok(())
    }

    fn write_module_table(&mut self, registry: &ModuleRegistry) -> std::io::Result<()> {
        writeln!(self.output, "Module table:")?;

        for module in registry.iter() {
            let range = module.range();

            write!(
                self.output,
                "{:x}-{:x}\t{} {}",
                range.start,
                range.end,
                module.linkage(),
                module.path().display()
            )?;

            if module.has_debug_info() {
                write!(self.output, " [debug info]")?;
            }

            writeln!(self.output)?;
        }

        writeln!(self.output)
    }

    fn write_line_tables(&mut self, module: &Module) -> std::io::Result<()> {
        writeln!(self.output, "--- <{}>", module.path().display())?;
        write_line_rows(&mut self.output, linestep_debugger::line_rows(module))?;
        writeln!(self.output)
    }

    fn write_step(&mut self, module: &Module, report: &StepReport<'_>) -> std::io::Result<bool> {
        let resolved = report.result.is_ok();

        if !resolved && !self.report_missing {
            return Ok(false);
        }

        writeln!(
            self.output,
            "Thread ID (PID): {} | Instruction address: {:x}",
            report.thread_id, report.instr_addr
        )?;

        match &report.result {
            Ok(entry) => {
                writeln!(self.output, "File path: {}", entry.file)?;
                writeln!(self.output, "Called from line {}", entry.line)?;
            }
            Err(LookupError::NoDebugInfo) => {
                writeln!(self.output, "File path: {}", module.path().display())?;
                writeln!(self.output, "No debug information available.")?;
            }
            Err(_) => {
                writeln!(self.output, "File path: {}", module.path().display())?;
                writeln!(self.output, "No line numbers found.")?;
            }
        }

        writeln!(self.output)?;

        Ok(resolved)
    }
}

fn write_line_rows<'a>(
    mut output: impl Write,
    rows: impl Iterator<Item = &'a LineRow>,
) -> std::io::Result<()> {
    for row in rows {
        if row.end_sequence {
            writeln!(output)?;
        } else {
            writeln!(output, "{:<40}{:>8}{:>#20x}", row.file, row.line, row.address)?;
        }
    }

    Ok(())
}

impl<W: Write, R: AsyncBufRead + Unpin> EventHandler for ConsoleHandler<W, R> {
    type Error = Error;

    async fn modules_loaded(
        &mut self,
        registry: &ModuleRegistry,
        main_module: &Module,
    ) -> Result<(), Self::Error> {
        if self.show_modules {
            self.write_module_table(registry).map_err(Error::Output)?;
        }

        if self.dump_line_tables {
            self.write_line_tables(main_module).map_err(Error::Output)?;
        }

        Ok(())
    }

    async fn entry_reached(
        &mut self,
        thread_id: u64,
        function: &str,
        entry: &LineEntry,
    ) -> Result<(), Self::Error> {
        writeln!(
            self.output,
            "Thread ID (PID): {thread_id} reached {function} at {}:{}\n",
            entry.file, entry.line
        )
        .map_err(Error::Output)
    }

    async fn entry_unresolved(
        &mut self,
        function: &str,
        error: &LookupError,
    ) -> Result<(), Self::Error> {
        writeln!(
            self.output,
            "Cannot break at {function} ({error}), stepping from the first instruction\n"
        )
        .map_err(Error::Output)
    }

    async fn line_stepped(&mut self, report: &StepReport<'_>) -> Result<(), Self::Error> {
        // addresses outside of any module are silently skipped
        let Some(module) = report.module else {
            return Ok(());
        };

        if self.write_step(module, report).map_err(Error::Output)? {
            self.wait_for_step().await?;
        }

        Ok(())
    }

    async fn thread_exited(
        &mut self,
        thread_id: u64,
        status: ExitStatus,
    ) -> Result<(), Self::Error> {
        writeln!(self.output, "Thread ID (PID): {thread_id} exited with {status}\n")
            .map_err(Error::Output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use linestep_debugger::{
        EventHandler, ExitStatus, LineEntry, LookupError, Module, ModuleRegistry, StepReport,
    };
    use linestep_symbol::{CompilationUnit, LineRow, LineTable, LinkageType};

    use super::ConsoleHandler;
    use crate::StepConfig;

    fn config(interactive: bool, report_missing: bool) -> StepConfig {
        StepConfig {
            interactive,
            report_missing,
            show_modules: true,
            dump_line_tables: true,
            entry_function: "main".to_owned(),
        }
    }

    fn row(address: u64, line: u32, end_sequence: bool) -> LineRow {
        LineRow {
            address,
            file: Arc::from("/src/hello.c"),
            line,
            end_sequence,
        }
    }

    fn hello_module() -> Module {
        let table = LineTable::new(vec![
            row(0x1139, 3, false),
            row(0x1141, 4, false),
            row(0x1150, 0, true),
        ]);

        let unit =
            CompilationUnit::new(Some("hello.c".into()), vec![0x1139..0x1150], table, vec![]);

        Module::new(
            "/tmp/hello",
            0x400000..0x402000,
            LinkageType::Executable,
            Some(Arc::from([unit])),
        )
    }

    fn libc_module() -> Module {
        Module::new(
            "/usr/lib/libc.so.6",
            0x7f0000000000..0x7f0000100000,
            LinkageType::PositionIndependent,
            None,
        )
    }

    fn output(handler: ConsoleHandler<Vec<u8>, &[u8]>) -> String {
        String::from_utf8(handler.into_output()).unwrap()
    }

    #[tokio::test]
    async fn modules_loaded_prints_table_and_line_tables() {
        let hello = hello_module();
        let registry = ModuleRegistry::new(vec![hello.clone(), libc_module()]);

        let mut handler = ConsoleHandler::new(&config(false, true), Vec::new(), &b""[..]);
        handler.modules_loaded(&registry, &hello).await.unwrap();

        let out = output(handler);
        let mut lines = out.lines();

        assert_eq!(lines.next(), Some("Module table:"));
        assert_eq!(lines.next(), Some("400000-402000\texec /tmp/hello [debug info]"));
        assert_eq!(lines.next(), Some("7f0000000000-7f0000100000\tdyn /usr/lib/libc.so.6"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("--- </tmp/hello>"));

        let row = lines.next().unwrap();
        assert!(row.starts_with("/src/hello.c"));
        assert!(row.ends_with("3              0x1139"));
    }

    #[tokio::test]
    async fn resolved_step_waits_for_input() {
        let hello = hello_module();
        let report = StepReport {
            thread_id: 42,
            instr_addr: 0x401141,
            module: Some(&hello),
            result: Ok(LineEntry {
                address: 0x1141,
                file: Arc::from("/src/hello.c"),
                line: 4,
            }),
        };

        let mut handler = ConsoleHandler::new(&config(true, true), Vec::new(), &b"\n"[..]);

        handler.line_stepped(&report).await.unwrap();
        assert!(handler.is_interactive());

        // input exhausted: the gate switches off
        handler.line_stepped(&report).await.unwrap();
        assert!(!handler.is_interactive());

        let out = output(handler);
        assert_eq!(
            out.lines().take(3).collect::<Vec<_>>(),
            [
                "Thread ID (PID): 42 | Instruction address: 401141",
                "File path: /src/hello.c",
                "Called from line 4",
            ]
        );
    }

    #[tokio::test]
    async fn missing_line_info_reports() {
        let libc = libc_module();
        let hello = hello_module();

        let mut handler = ConsoleHandler::new(&config(true, true), Vec::new(), &b""[..]);

        handler
            .line_stepped(&StepReport {
                thread_id: 7,
                instr_addr: 0x7f0000000010,
                module: Some(&libc),
                result: Err(LookupError::NoDebugInfo),
            })
            .await
            .unwrap();

        handler
            .line_stepped(&StepReport {
                thread_id: 7,
                instr_addr: 0x401800,
                module: Some(&hello),
                result: Err(LookupError::NoLineInfo),
            })
            .await
            .unwrap();

        // unresolved steps never consume input
        assert!(handler.is_interactive());

        let out = output(handler);
        assert!(out.contains("File path: /usr/lib/libc.so.6\nNo debug information available.\n"));
        assert!(out.contains("File path: /tmp/hello\nNo line numbers found.\n"));
    }

    #[tokio::test]
    async fn missing_line_info_can_be_silenced() {
        let libc = libc_module();

        let mut handler = ConsoleHandler::new(&config(false, false), Vec::new(), &b""[..]);

        handler
            .line_stepped(&StepReport {
                thread_id: 7,
                instr_addr: 0x7f0000000010,
                module: Some(&libc),
                result: Err(LookupError::NoDebugInfo),
            })
            .await
            .unwrap();

        handler
            .line_stepped(&StepReport {
                thread_id: 7,
                instr_addr: 0x10,
                module: None,
                result: Err(LookupError::Unmapped(0x10)),
            })
            .await
            .unwrap();

        handler.thread_exited(7, ExitStatus::ExitCode(0)).await.unwrap();

        assert_eq!(output(handler), "Thread ID (PID): 7 exited with exit code 0\n\n");
    }

    #[tokio::test]
    async fn entry_reports() {
        let mut handler = ConsoleHandler::new(&config(false, true), Vec::new(), &b""[..]);

        handler
            .entry_reached(
                42,
                "main",
                &LineEntry {
                    address: 0x1141,
                    file: Arc::from("/src/hello.c"),
                    line: 4,
                },
            )
            .await
            .unwrap();

        handler
            .entry_unresolved("worker", &LookupError::FunctionNotFound("worker".into()))
            .await
            .unwrap();

        let out = output(handler);
        assert!(out.starts_with("Thread ID (PID): 42 reached main at /src/hello.c:4\n"));
        assert!(out.contains("Cannot break at worker (function worker not found)"));
    }
}
