//! Option resolution: merging command-line overrides over the file configuration.

use crate::error::ConfigError;
use crate::types::{ExitCodeMode, StrandConfig};
use std::path::{Path, PathBuf};

/// The effective options of one analysis session.
///
/// Built once by [`resolve_options`] and passed explicitly to the compiler
/// and analysis context constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Diet-parse unchanged units and reuse persisted dependency records.
    pub incremental: bool,
    /// Continue into resolution when parse errors were reported.
    pub resolve_despite_parse_errors: bool,
    /// Count static type problems as errors.
    pub type_errors_are_fatal: bool,
    /// Count warnings as errors.
    pub warnings_are_fatal: bool,
    /// Artifact directory.
    pub output_dir: PathBuf,
    /// Search roots for `package:` URIs.
    pub package_roots: Vec<String>,
    /// System library directory; embedded texts are used when `None`.
    pub sdk: Option<PathBuf>,
    /// Libraries every library imports implicitly.
    pub embedded_libraries: Vec<String>,
    /// Process exit code mapping.
    pub exit_mode: ExitCodeMode,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            incremental: false,
            resolve_despite_parse_errors: false,
            type_errors_are_fatal: false,
            warnings_are_fatal: false,
            output_dir: PathBuf::from("out"),
            package_roots: Vec::new(),
            sdk: None,
            embedded_libraries: vec!["std:core".to_string()],
            exit_mode: ExitCodeMode::Collapse,
        }
    }
}

/// Values given on the command line. `None` keeps the file's value.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Overrides `analysis.incremental`.
    pub incremental: Option<bool>,
    /// Overrides `analysis.resolve_despite_parse_errors`.
    pub resolve_despite_parse_errors: Option<bool>,
    /// Overrides `analysis.type_errors_are_fatal`.
    pub type_errors_are_fatal: Option<bool>,
    /// Overrides `analysis.warnings_are_fatal`.
    pub warnings_are_fatal: Option<bool>,
    /// Overrides `output.dir`.
    pub output_dir: Option<PathBuf>,
    /// Searched before the configured package roots.
    pub package_roots: Vec<String>,
    /// Overrides `system.sdk`.
    pub sdk: Option<PathBuf>,
    /// Overrides `exit.mode`.
    pub exit_mode: Option<ExitCodeMode>,
}

/// Merges `overrides` over `config` (or the defaults when there is no
/// configuration file). Relative paths from the file are taken relative to
/// `project_dir`.
pub fn resolve_options(
    config: Option<&StrandConfig>,
    project_dir: &Path,
    overrides: &ConfigOverrides,
) -> Result<CompilerOptions, ConfigError> {
    let mut options = CompilerOptions::default();

    if let Some(config) = config {
        let analysis = &config.analysis;
        options.incremental = analysis.incremental;
        options.resolve_despite_parse_errors = analysis.resolve_despite_parse_errors;
        options.type_errors_are_fatal = analysis.type_errors_are_fatal;
        options.warnings_are_fatal = analysis.warnings_are_fatal;
        options.output_dir = project_dir.join(&config.output.dir);
        options.package_roots = config
            .packages
            .roots
            .iter()
            .map(|root| path_string(&project_dir.join(root)))
            .collect();
        options.sdk = config.system.sdk.as_ref().map(|sdk| project_dir.join(sdk));
        options.embedded_libraries = config.system.embedded.clone();
        options.exit_mode = config.exit.mode;
    } else {
        options.output_dir = project_dir.join(&options.output_dir);
    }

    if let Some(v) = overrides.incremental {
        options.incremental = v;
    }
    if let Some(v) = overrides.resolve_despite_parse_errors {
        options.resolve_despite_parse_errors = v;
    }
    if let Some(v) = overrides.type_errors_are_fatal {
        options.type_errors_are_fatal = v;
    }
    if let Some(v) = overrides.warnings_are_fatal {
        options.warnings_are_fatal = v;
    }
    if let Some(dir) = &overrides.output_dir {
        options.output_dir = dir.clone();
    }
    if !overrides.package_roots.is_empty() {
        let mut roots = overrides.package_roots.clone();
        roots.append(&mut options.package_roots);
        options.package_roots = roots;
    }
    if let Some(sdk) = &overrides.sdk {
        options.sdk = Some(sdk.clone());
    }
    if let Some(mode) = overrides.exit_mode {
        options.exit_mode = mode;
    }

    if options.embedded_libraries.is_empty() {
        return Err(ConfigError::Invalid(
            "at least one embedded library is required".to_string(),
        ));
    }
    Ok(options)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
