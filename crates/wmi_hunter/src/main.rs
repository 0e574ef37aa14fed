//! wmi-hunter command line
//!
//! Prints every FilterToConsumerBinding found in an `OBJECTS.DATA` file as
//! JSON on stdout. Status lines and logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use wmi_hunter::{
    hunt_with_progress, render, DecodePolicy, FileSource, HuntProgress, HunterConfig, RenderStyle,
};
use wmi_hunter_logging::{init_logging, LogConfig};

#[derive(Parser, Debug)]
#[command(
    name = "wmi-hunter",
    version,
    about = "Find WMI FilterToConsumerBinding persistence in a raw OBJECTS.DATA file"
)]
struct Cli {
    /// Path to the WMI repository OBJECTS.DATA file
    objects_data: PathBuf,

    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Suppress status lines on stderr
    #[arg(short, long)]
    quiet: bool,

    /// Abort on the first captured span that is not valid UTF-8
    #[arg(long)]
    strict: bool,

    /// Number of trailing chunks searched together
    #[arg(long, value_name = "N")]
    window: Option<usize>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE", env = "WMI_HUNTER_CONFIG")]
    config: Option<PathBuf>,

    /// Write the JSON report to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit single-line JSON
    #[arg(long)]
    compact: bool,

    /// Also keep a daily log file under ~/.wmi_hunter/logs
    #[arg(long)]
    log_file: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match init_logging(LogConfig {
        app_name: "wmi-hunter",
        verbose: cli.verbose,
        log_to_file: cli.log_file,
    }) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: failed to initialize logging: {:#}", err);
            None
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:?}", err);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let source = FileSource::new(&cli.objects_data);
    let quiet = cli.quiet;

    let outcome = hunt_with_progress(&source, &config, |progress| {
        if quiet {
            return;
        }
        match progress {
            HuntProgress::DiscoveryStarted => eprintln!(
                "\nWorking to find and enumerate FilterToConsumerBindings ... (please wait)"
            ),
            HuntProgress::BindingsFound(count) => eprintln!(
                "{} FilterToConsumerBinding(s) Found. Enumerating Filters and Consumers...",
                count
            ),
            HuntProgress::CorrelationFinished => {
                eprintln!("\nBindings found in json format:\n")
            }
        }
    })
    .with_context(|| format!("Failed to scan {}", cli.objects_data.display()))?;

    let style = if cli.compact {
        RenderStyle::Compact
    } else {
        RenderStyle::Pretty
    };
    let json = render(&outcome.report, style).context("Failed to serialize report")?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !quiet {
                eprintln!("Report written to {}", path.display());
            }
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// File config first, then command line overrides.
fn load_config(cli: &Cli) -> Result<HunterConfig> {
    let mut config = match &cli.config {
        Some(path) => HunterConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => HunterConfig::default(),
    };
    if let Some(window) = cli.window {
        config.window_chunks = window;
    }
    if cli.strict {
        config.decode_policy = DecodePolicy::Strict;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["wmi-hunter", "OBJECTS.DATA"]).unwrap();
        assert_eq!(cli.objects_data, PathBuf::from("OBJECTS.DATA"));
        assert!(!cli.strict);

        let config = load_config(&cli).unwrap();
        assert_eq!(config.window_chunks, 4);
        assert_eq!(config.decode_policy, DecodePolicy::Skip);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "wmi-hunter",
            "--strict",
            "--window",
            "8",
            "--compact",
            "OBJECTS.DATA",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.window_chunks, 8);
        assert_eq!(config.decode_policy, DecodePolicy::Strict);
        assert!(cli.compact);
    }

    #[test]
    fn test_cli_rejects_zero_window() {
        let cli = Cli::try_parse_from(["wmi-hunter", "--window", "0", "OBJECTS.DATA"]).unwrap();
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_cli_requires_path() {
        assert!(Cli::try_parse_from(["wmi-hunter"]).is_err());
    }
}
