/// Configuration of a line-stepping session.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct StepConfig {
    /// Whether to wait for a line on stdin after each resolved step.
    #[knus(child, default = true, unwrap(argument))]
    pub interactive: bool,

    /// Whether to report steps for which no line information exists.
    #[knus(child, default = true, unwrap(argument))]
    pub report_missing: bool,

    /// Whether to print the module table of the debuggee.
    #[knus(child, default = false, unwrap(argument))]
    pub show_modules: bool,

    /// Whether to print the line tables of the debugged program.
    #[knus(child, default = false, unwrap(argument))]
    pub dump_line_tables: bool,

    /// Function at which stepping starts.
    #[knus(child, default = "main".into(), unwrap(argument))]
    pub entry_function: String,
}

#[cfg(test)]
mod tests {

    use super::StepConfig;

    #[test]
    fn parse_from_kdl_defaults() {
        let config = knus::parse::<StepConfig>("<content>", "")
            .map_err(miette::Report::new)
            .expect("parse kdl");

        assert_eq!(
            config,
            StepConfig {
                interactive: true,
                report_missing: true,
                show_modules: false,
                dump_line_tables: false,
                entry_function: "main".to_owned(),
            }
        );
    }

    #[test]
    fn parse_from_kdl_overrides() {
        let config = knus::parse::<StepConfig>(
            "<content>",
            indoc::indoc! {r#"
                interactive false
                show-modules true
                entry-function "worker"
            "#},
        )
        .map_err(miette::Report::new)
        .expect("parse kdl");

        assert_eq!(
            config,
            StepConfig {
                interactive: false,
                report_missing: true,
                show_modules: true,
                dump_line_tables: false,
                entry_function: "worker".to_owned(),
            }
        );

        let config = knus::parse::<StepConfig>(
            "<content>",
            indoc::indoc! {r#"
                report-missing false
                dump-line-tables true
            "#},
        )
        .map_err(miette::Report::new)
        .expect("parse kdl");

        assert!(!config.report_missing);
        assert!(config.dump_line_tables);
        assert!(config.interactive);
    }

    #[test]
    fn parse_from_kdl_rejects_unknown_node() {
        assert!(knus::parse::<StepConfig>("<content>", "call-depth 1").is_err());
    }
}
