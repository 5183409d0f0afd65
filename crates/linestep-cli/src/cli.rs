use std::path::PathBuf;

/// The linestep debugger.
///
/// Spawns a program, runs it up to its entry function, then prints the
/// source line of every instruction executed by any of its threads.
#[derive(clap::Parser)]
pub struct CliOpts {
    /// Stepping configuration (KDL format).
    ///
    /// If it ends with `.kdl`, it is treated as a path to a configuration
    /// file. Otherwise it is directly parsed as inline KDL-formatted
    /// configuration.
    #[clap(short, long, value_name = "CONTENT/PATH", default_value = "")]
    pub config: String,

    /// Name of program to run.
    pub program: PathBuf,

    /// Program's arguments.
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl CliOpts {
    /// Parses the CLI from the command-line.
    ///
    /// # Warning
    ///
    /// Exits on error.
    pub fn parse_from_cmdline() -> Self {
        <Self as clap::Parser>::parse()
    }
}
