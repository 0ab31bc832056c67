//! Strand CLI, the command-line front end of the Strand analyzer.
//!
//! `strand check` compiles an application and everything it imports,
//! persisting dependency records so the next check only reparses what
//! changed. `strand analyze` loads a set of sources into an analysis
//! context and drains its background tasks, the way an editor would.

#![warn(missing_docs)]

mod analyze;
mod check;
mod pipeline;

use std::io::IsTerminal;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use strand_compiler::CRASH_EXIT_CODE;
use strand_config::{ConfigOverrides, ExitCodeMode};
use tracing_subscriber::EnvFilter;

/// Strand, an incremental analyzer for `.st` libraries.
#[derive(Parser, Debug)]
#[command(name = "strand", version, about = "Strand analyzer")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (trace-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `strand.toml` file or the directory holding it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile an application and report its problems.
    Check(CheckArgs),
    /// Analyze sources the way an editor session does.
    Analyze(AnalyzeArgs),
}

/// Arguments for `strand check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Root library; defaults to `project.entry` from `strand.toml`.
    pub entry: Option<PathBuf>,

    /// Output format for diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    #[command(flatten)]
    pub options: OptionArgs,
}

/// Arguments for `strand analyze`.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Files or directories to load; defaults to the project directory.
    pub paths: Vec<PathBuf>,

    /// Output format for diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    #[command(flatten)]
    pub options: OptionArgs,
}

/// Command-line overrides of the `strand.toml` settings.
#[derive(Args, Debug, Default)]
pub struct OptionArgs {
    /// Diet-parse units whose dependencies did not change.
    #[arg(long)]
    pub incremental: bool,

    /// Resolve libraries even when parsing reported errors.
    #[arg(long)]
    pub resolve_despite_parse_errors: bool,

    /// Count static type problems as errors.
    #[arg(long)]
    pub fatal_type_errors: bool,

    /// Count warnings as errors.
    #[arg(long)]
    pub fatal_warnings: bool,

    /// Artifact directory.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Extra search root for `package:` URIs (repeatable).
    #[arg(long = "package-root")]
    pub package_roots: Vec<String>,

    /// System library directory to use instead of the embedded one.
    #[arg(long)]
    pub sdk: Option<PathBuf>,

    /// How results map to the process exit code.
    #[arg(long, value_enum)]
    pub exit_mode: Option<ExitMode>,
}

impl OptionArgs {
    /// Converts the flags into overrides; unset flags keep the file's value.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            incremental: self.incremental.then_some(true),
            resolve_despite_parse_errors: self.resolve_despite_parse_errors.then_some(true),
            type_errors_are_fatal: self.fatal_type_errors.then_some(true),
            warnings_are_fatal: self.fatal_warnings.then_some(true),
            output_dir: self.out.clone(),
            package_roots: self.package_roots.clone(),
            sdk: self.sdk.clone(),
            exit_mode: self.exit_mode.map(ExitCodeMode::from),
        }
    }
}

/// Exit code mapping selectable on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExitMode {
    /// Errors exit with 1, everything else with 0.
    Collapse,
    /// OK 0, warnings 1, errors 2, other 127.
    Extended,
}

impl From<ExitMode> for ExitCodeMode {
    fn from(mode: ExitMode) -> Self {
        match mode {
            ExitMode::Collapse => ExitCodeMode::Collapse,
            ExitMode::Extended => ExitCodeMode::Extended,
        }
    }
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Color when stderr is a terminal.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Diagnostic output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };
    init_logging(cli.verbose, cli.quiet, color);

    let global = GlobalArgs {
        quiet: cli.quiet,
        color,
        config: cli.config.clone(),
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match &cli.command {
        Command::Check(args) => check::run(args, &global),
        Command::Analyze(args) => analyze::run(args, &global),
    }));

    let code = match outcome {
        Ok(Ok(code)) => code,
        Ok(Err(e)) => {
            eprintln!("error: {e}");
            1
        }
        Err(_) => {
            tracing::error!("analyzer crashed");
            CRASH_EXIT_CODE
        }
    };
    process::exit(code);
}

/// The default log filter for the verbosity flags. `--verbose` wins over
/// `--quiet`.
fn log_level(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "trace"
    } else if quiet {
        "error"
    } else {
        "warn"
    }
}

/// Installs the stderr subscriber. `STRAND_LOG` replaces the level chosen by
/// the flags.
fn init_logging(verbose: bool, quiet: bool, color: bool) {
    let filter = EnvFilter::try_from_env("STRAND_LOG")
        .unwrap_or_else(|_| EnvFilter::new(log_level(verbose, quiet)));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: a log subscriber is already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_check_default() {
        let cli = Cli::parse_from(["strand", "check"]);
        match cli.command {
            Command::Check(ref args) => {
                assert!(args.entry.is_none());
                assert_eq!(args.format, ReportFormat::Text);
                assert!(!args.options.incremental);
            }
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn parse_check_with_entry_and_flags() {
        let cli = Cli::parse_from([
            "strand",
            "check",
            "web/app.st",
            "--incremental",
            "--fatal-warnings",
            "--out",
            "build",
            "--package-root",
            "/pkgs",
            "--package-root",
            "/more",
            "--exit-mode",
            "extended",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Check(ref args) => {
                assert_eq!(args.entry.as_deref(), Some(std::path::Path::new("web/app.st")));
                assert_eq!(args.format, ReportFormat::Json);
                assert!(args.options.incremental);
                assert!(args.options.fatal_warnings);
                assert_eq!(args.options.package_roots, vec!["/pkgs", "/more"]);
                assert_eq!(args.options.exit_mode, Some(ExitMode::Extended));
            }
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn parse_analyze_paths() {
        let cli = Cli::parse_from(["strand", "analyze", "lib", "web/index.html"]);
        match cli.command {
            Command::Analyze(ref args) => {
                assert_eq!(args.paths.len(), 2);
                assert!(args.options.sdk.is_none());
            }
            _ => panic!("expected Analyze command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["strand", "--quiet", "--color", "never", "check"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["strand", "--config", "/path/to/strand.toml", "analyze"]);
        assert_eq!(
            cli.config.as_deref(),
            Some(std::path::Path::new("/path/to/strand.toml"))
        );
    }

    #[test]
    fn unset_flags_keep_file_values() {
        let overrides = OptionArgs::default().overrides();
        assert!(overrides.incremental.is_none());
        assert!(overrides.warnings_are_fatal.is_none());
        assert!(overrides.exit_mode.is_none());
        assert!(overrides.package_roots.is_empty());
    }

    #[test]
    fn set_flags_override() {
        let args = OptionArgs {
            fatal_type_errors: true,
            exit_mode: Some(ExitMode::Collapse),
            ..OptionArgs::default()
        };
        let overrides = args.overrides();
        assert_eq!(overrides.type_errors_are_fatal, Some(true));
        assert_eq!(overrides.exit_mode, Some(ExitCodeMode::Collapse));
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(log_level(false, false), "warn");
        assert_eq!(log_level(false, true), "error");
        assert_eq!(log_level(true, false), "trace");
        assert_eq!(log_level(true, true), "trace");
    }
}
