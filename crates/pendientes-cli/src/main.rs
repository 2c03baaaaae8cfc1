// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, bail};
use config::Config;
use pendientes_app::{AppState, Session, TaskTable};
use pendientes_sheets::MemorySheet;
use pendientes_tui::{AppRuntime, Branding};
use runtime::{SheetRuntime, SheetSource};
use std::env;
use std::path::PathBuf;

const DEMO_WORKSHEET: &str = "Hoja 1";
const DEMO_EXPORT_FILE: &str = "pendientes-demo.xlsx";

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `pendientes --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let log_path = config.log_path()?;
    let _log_guard = logging::init(config.log_level(), &log_path)
        .with_context(|| format!("open log file {}", log_path.display()))?;
    tracing::info!(
        config = %options.config_path.display(),
        demo = options.demo,
        "starting pendientes"
    );

    let mut runtime = build_runtime(&config, options.demo)?;
    if options.check_only {
        let table = runtime.connect()?;
        println!("{}", check_summary(&table)?);
        return Ok(());
    }

    let branding = Branding {
        title: config.title().to_owned(),
        logos: config.present_logos(),
    };
    pendientes_tui::run_app(&mut AppState::default(), &mut runtime, branding)
}

fn build_runtime(config: &Config, demo: bool) -> Result<SheetRuntime> {
    if demo {
        let sheet = MemorySheet::new(DEMO_WORKSHEET, pendientes_testkit::demo_grid());
        let export_path = env::temp_dir().join(DEMO_EXPORT_FILE);
        return Ok(SheetRuntime::new(SheetSource::Memory(sheet), export_path));
    }

    let source = SheetSource::Google {
        name: config.sheet_name().to_owned(),
        secrets_path: config.secrets_path()?,
        key_file: config.credentials_path(),
        endpoints: config.endpoints(),
        timeout: config.timeout()?,
    };
    Ok(SheetRuntime::new(source, config.export_path()))
}

/// One-line summary for `--check`. Fails when the sheet cannot back the
/// dashboard.
fn check_summary(table: &TaskTable) -> Result<String> {
    if table.is_empty() {
        bail!("worksheet has no task rows");
    }
    let session = Session::new(table.clone());
    if let Some(unresolved) = session.unresolved_roles() {
        bail!("{unresolved}; columns are {:?}", table.columns());
    }
    let owners = session
        .options()
        .map(|options| options.owners.len())
        .unwrap_or_default();
    Ok(format!(
        "ok: {} rows, {} columns, {} owners",
        table.len(),
        table.columns().len(),
        owners
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("pendientes");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch with generated tasks (in-memory sheet)");
    println!("  --check                  Connect, load the sheet, and resolve columns");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, build_runtime, check_summary, parse_cli_args};
    use crate::config::Config;
    use anyhow::Result;
    use pendientes_testkit::{scenario_table, unresolved_table};
    use pendientes_tui::AppRuntime;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/pendientes-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--print-path"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_demo_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--demo", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(!options.print_config_path);
        assert!(options.demo);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }

    #[test]
    fn check_summary_counts_rows_and_owners() -> Result<()> {
        let summary = check_summary(&scenario_table())?;
        assert_eq!(summary, "ok: 4 rows, 5 columns, 2 owners");
        Ok(())
    }

    #[test]
    fn check_summary_names_unresolved_roles() {
        let error = check_summary(&unresolved_table()).expect_err("roles are missing");
        let message = error.to_string();
        assert!(message.contains("no column matches role(s)"));
        assert!(message.contains("Encargado"));
    }

    #[test]
    fn check_summary_rejects_empty_sheet() {
        let error = check_summary(&pendientes_app::TaskTable::default()).expect_err("empty");
        assert!(error.to_string().contains("no task rows"));
    }

    #[test]
    fn demo_runtime_connects_without_credentials() -> Result<()> {
        let mut runtime = build_runtime(&Config::default(), true)?;
        let table = runtime.connect()?;
        assert_eq!(table.len(), 24);
        assert!(check_summary(&table)?.starts_with("ok: 24 rows"));
        Ok(())
    }
}
