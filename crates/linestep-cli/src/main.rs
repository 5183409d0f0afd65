#![allow(missing_docs)]
#![allow(clippy::print_stderr)]

use linestep_cli::{CliOpts, evaluate_run};

use tracing_subscriber::EnvFilter;

fn main() {
    let cli = CliOpts::parse_from_cmdline();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("LINESTEP_LOG")
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = evaluate_run(cli.config, cli.program, cli.args) {
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}
