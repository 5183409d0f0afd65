use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};

use linestep_debugger::Debugger;
use miette::IntoDiagnostic;
use tokio::io::BufReader;

use crate::{ConsoleHandler, StepConfig};

/// Runs a line-stepping session over the given program.
pub fn evaluate_run(config: String, program: PathBuf, args: Vec<String>) -> miette::Result<()> {
    let config = parse_run_config(config)?;

    // every ptrace request must come from the thread which spawned the debuggee
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    runtime.block_on(async move {
        let session = Debugger::spawn(&program, args)
            .await
            .into_diagnostic()?
            .with_entry_function(&config.entry_function);

        let mut handler = ConsoleHandler::new(
            &config,
            std::io::stdout(),
            BufReader::new(tokio::io::stdin()),
        );

        let outcome = session.run(&mut handler).await.into_diagnostic()?;

        tracing::info!(
            steps = outcome.steps,
            threads = outcome.threads.len(),
            exit_status = ?outcome.exit_status,
            "session ended"
        );

        let mut stdout = handler.into_output();

        writeln!(stdout, "Program '{}' terminated.", program.display()).into_diagnostic()?;

        Ok(())
    })
}

fn parse_run_config(config: String) -> miette::Result<StepConfig> {
    let path = Path::new(&config);

    let config = if let Some((filename, "kdl")) = path
        .file_name()
        .and_then(OsStr::to_str)
        .zip(path.extension().and_then(OsStr::to_str))
    {
        let content = std::fs::read_to_string(path).into_diagnostic()?;
        knus::parse(filename, &content)?
    } else {
        knus::parse("<content>", &config)?
    };

    Ok(config)
}
