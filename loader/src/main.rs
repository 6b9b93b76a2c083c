//! bowparser native loader CLI entrypoint.
//!
//! Loads the bundled jSerialComm library into this process and reports
//! where it came from. Mostly useful for checking a packaged install.

use bowparser_native::cli::Cli;
use bowparser_native::config::LoaderConfig;
use bowparser_native::error::Result;
use bowparser_native::ensure_native_loaded;
use bowparser_native::output::{DryRunInfo, success_message, write_line};
use bowparser_native::target::{host_descriptor, select_target};
use clap::Parser;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_logging(cli: &Cli) {
    let result = env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
    if result.is_err() {
        // A logger is already installed; keep it.
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    let config = resolve_config(cli)?;

    if cli.dry_run {
        let host = effective_host(&config);
        let info = DryRunInfo {
            host,
            target: select_target(host),
            config: &config,
        };
        write_line(stderr, info.display_text());
        return Ok(());
    }

    let loaded = ensure_native_loaded(&config)?;
    write_line(stdout, success_message(loaded));
    Ok(())
}

/// Reads the configuration file, if any, then applies CLI overrides.
fn resolve_config(cli: &Cli) -> Result<LoaderConfig> {
    let base = match &cli.config {
        Some(path) => LoaderConfig::from_file(path)?,
        None => LoaderConfig::default(),
    };
    Ok(cli.apply_overrides(base))
}

fn effective_host(config: &LoaderConfig) -> &str {
    config.host_arch.as_deref().unwrap_or_else(|| host_descriptor())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_line(stderr, format!("error: {err}"));
            1
        }
    }
}
