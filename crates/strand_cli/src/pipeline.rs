//! Shared pipeline helpers for CLI commands.
//!
//! Project root discovery, option resolution, source discovery and
//! diagnostic reporting used by both `check` and `analyze`.

use std::error::Error;
use std::path::{Path, PathBuf};

use strand_config::{load_config, resolve_options, CompilerOptions, StrandConfig, CONFIG_FILE};
use strand_diagnostics::{Diagnostic, DiagnosticRenderer, Severity, TerminalRenderer};
use strand_source::SourceFactory;

use crate::{GlobalArgs, OptionArgs, ReportFormat};

/// Extensions of files the analyzer loads.
const SOURCE_EXTENSIONS: &[&str] = &["st", "html"];

/// A project directory with its configuration and effective options.
pub struct Project {
    /// Directory holding `strand.toml`, or the working directory.
    pub dir: PathBuf,
    /// The parsed configuration, if a `strand.toml` was found.
    pub config: Option<StrandConfig>,
    /// Options after command-line overrides.
    pub options: CompilerOptions,
}

impl Project {
    /// The root library: `explicit` if given, otherwise `project.entry`.
    pub fn entry(&self, explicit: Option<&Path>) -> Result<PathBuf, Box<dyn Error>> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        match &self.config {
            Some(config) => Ok(self.dir.join(&config.project.entry)),
            None => Err(format!(
                "no entry library given and no {CONFIG_FILE} found in {}",
                self.dir.display()
            )
            .into()),
        }
    }
}

/// Walks up from `start` looking for the nearest directory containing
/// `strand.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Locates the project, loads its configuration and merges `args` over it.
///
/// `--config` names the file or its directory. Without it the nearest
/// `strand.toml` above the working directory is used; with none found the
/// working directory is the project and defaults apply.
pub fn load_project(global: &GlobalArgs, args: &OptionArgs) -> Result<Project, Box<dyn Error>> {
    let (dir, config) = match &global.config {
        Some(path) => {
            let dir = if path.is_file() {
                path.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."))
            } else {
                path.clone()
            };
            let config = load_config(&dir)?;
            (dir, Some(config))
        }
        None => {
            let cwd = std::env::current_dir()?;
            match find_project_root(&cwd) {
                Some(dir) => {
                    let config = load_config(&dir)?;
                    (dir, Some(config))
                }
                None => (cwd, None),
            }
        }
    };
    let options = resolve_options(config.as_ref(), &dir, &args.overrides())?;
    tracing::debug!(project = %dir.display(), ?options, "options resolved");
    Ok(Project {
        dir,
        config,
        options,
    })
}

/// The URI of a filesystem path, as the file source provider reads it.
pub fn path_uri(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Discovers `.st` and `.html` files under `paths` (recursive), sorted.
/// Files named directly are kept whatever their extension.
pub fn discover_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk_dir(path, &mut files)?;
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(format!("{} does not exist", path.display()).into());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), Box<dyn Error>> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_dir(&path, files)?;
        } else if is_source_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// Returns `true` for files with an extension the analyzer loads.
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e))
}

/// Error and warning counts of a report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    /// Diagnostics with error severity.
    pub errors: usize,
    /// Diagnostics with warning severity.
    pub warnings: usize,
}

/// Counts errors and warnings in `diagnostics`.
pub fn count(diagnostics: &[Diagnostic]) -> Counts {
    let mut counts = Counts::default();
    for diag in diagnostics {
        match diag.severity {
            Severity::Error => counts.errors += 1,
            Severity::Warning => counts.warnings += 1,
        }
    }
    counts
}

/// Writes `diagnostics` as text to stderr or as JSON to stdout.
pub fn report(
    diagnostics: &[Diagnostic],
    factory: &SourceFactory,
    format: ReportFormat,
    global: &GlobalArgs,
) {
    match format {
        ReportFormat::Text => {
            let renderer = TerminalRenderer::new(global.color);
            let db = factory.source_db();
            for diag in diagnostics {
                eprintln!("{}", renderer.render(diag, &db));
            }
            if !global.quiet {
                let counts = count(diagnostics);
                eprintln!(
                    "   Result: {} error(s), {} warning(s)",
                    counts.errors, counts.warnings
                );
            }
        }
        ReportFormat::Json => {
            let json =
                serde_json::to_string_pretty(diagnostics).unwrap_or_else(|_| "[]".to_string());
            println!("{json}");
        }
    }
}
