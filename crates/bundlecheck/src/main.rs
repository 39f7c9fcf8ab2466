//! Bundlecheck - verify signature files inside nested release bundles.

use anyhow::{bail, Context};
use bundlecheck_schema::{check_config_file, load_config, validate_config, AppConfig};
use bundlecheck_verifier::{ConsoleSink, Verifier, VerifyOptions};
use clap::{Parser, Subcommand};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bundlecheck")]
#[command(
    author,
    version,
    about = "Extract nested release bundles and compare signature files against trusted copies"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a bundle described by a configuration file
    Verify {
        /// Configuration file (YAML or JSON)
        #[arg(long, short)]
        config: PathBuf,

        /// Directory holding the top-level bundle
        #[arg(long)]
        bundle_dir: Option<PathBuf>,

        /// Scratch directory for extracted archives
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Non-interactive run; extracted archives are left in place
        #[arg(long)]
        pipeline: bool,

        /// Keep the working directory after the run
        #[arg(long)]
        keep_work_dir: bool,

        /// Disable the extraction ticker
        #[arg(long)]
        no_progress: bool,

        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Check a configuration file without running verification
    ValidateConfig {
        /// Configuration file (YAML or JSON)
        #[arg(long, short)]
        config: PathBuf,
    },
}

/// Whether the working directory is removed at the end of a run.
fn cleanup_requested(pipeline: bool, keep_work_dir: bool) -> bool {
    !pipeline && !keep_work_dir
}

fn init_logging(verbose: bool, config: Option<&AppConfig>) -> anyhow::Result<bool> {
    let level = config
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(level)
    };

    let log_file = config.and_then(AppConfig::log_file);
    let colors = config.map_or(true, |c| c.application.enable_colors);

    let writer = match &log_file {
        Some(path) => BoxMakeWriter::new(Mutex::new(open_log_file(path)?)),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(colors && log_file.is_none())
                .with_writer(writer),
        )
        .with(filter)
        .init();

    Ok(log_file.is_some())
}

fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {:?}", parent))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {:?}", path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Verify {
            config,
            bundle_dir,
            work_dir,
            pipeline,
            keep_work_dir,
            no_progress,
            report,
        } => {
            let app_config = load_config(&config)
                .with_context(|| format!("Failed to load configuration {:?}", config))?;
            let logging_to_file = init_logging(cli.verbose, Some(&app_config))?;

            let validation = validate_config(&app_config);
            for warning in &validation.warnings {
                warn!("{}", warning);
            }
            if !validation.valid {
                for error in &validation.errors {
                    eprintln!("error: {}", error);
                }
                bail!("Configuration {:?} is invalid", config);
            }

            let schema = app_config.bundle_schema(bundle_dir.as_deref(), work_dir.as_deref())?;
            let options = VerifyOptions {
                cleanup: cleanup_requested(pipeline, keep_work_dir),
                nested_failure: app_config.application.nested_failure,
                exempt_extensions: app_config.application.exempt_extensions.clone(),
                show_progress: !no_progress,
            };
            info!(
                "Verifying {:?} in {:?}",
                schema.source_path(),
                schema.working_directory
            );

            let run_report = tokio::task::spawn_blocking(move || {
                let mut sink = ConsoleSink::new(logging_to_file);
                Verifier::new(options).run(&schema, &mut sink)
            })
            .await
            .context("Verification task failed")?;

            println!("{}", run_report.summary());

            if let Some(path) = &report {
                run_report
                    .write_json(path)
                    .with_context(|| format!("Failed to write report {:?}", path))?;
                info!("Report written to {:?}", path);
            }

            std::process::exit(run_report.exit_code());
        }

        Commands::ValidateConfig { config } => {
            init_logging(cli.verbose, None)?;

            let result = check_config_file(&config)
                .with_context(|| format!("Failed to read configuration {:?}", config))?;

            for warning in &result.warnings {
                println!("warning: {}", warning);
            }
            for error in &result.errors {
                println!("error: {}", error);
            }

            if !result.valid {
                bail!("Configuration {:?} is invalid", config);
            }
            println!("Configuration {:?} is valid", config);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_verify_arguments() {
        let cli = Cli::try_parse_from([
            "bundlecheck",
            "--verbose",
            "verify",
            "--config",
            "bundlecheck.yaml",
            "--bundle-dir",
            "/drop",
            "--pipeline",
            "--report",
            "report.json",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Verify {
                config,
                bundle_dir,
                work_dir,
                pipeline,
                keep_work_dir,
                report,
                ..
            } => {
                assert_eq!(config, PathBuf::from("bundlecheck.yaml"));
                assert_eq!(bundle_dir, Some(PathBuf::from("/drop")));
                assert_eq!(work_dir, None);
                assert!(pipeline);
                assert!(!keep_work_dir);
                assert_eq!(report, Some(PathBuf::from("report.json")));
            }
            Commands::ValidateConfig { .. } => panic!("expected verify"),
        }
    }

    #[test]
    fn test_config_is_required() {
        assert!(Cli::try_parse_from(["bundlecheck", "verify"]).is_err());
        assert!(Cli::try_parse_from(["bundlecheck", "validate-config"]).is_err());
    }

    #[test]
    fn test_cleanup_only_for_interactive_runs() {
        assert!(cleanup_requested(false, false));
        assert!(!cleanup_requested(true, false));
        assert!(!cleanup_requested(false, true));
    }

    #[test]
    fn test_open_log_file_creates_parent() {
        let temp = assert_fs::TempDir::new().unwrap();
        let log = temp.child("logs/run.log");
        open_log_file(log.path()).unwrap();
        log.assert(predicates::path::exists());
    }
}
