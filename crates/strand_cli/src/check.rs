//! `strand check`: compile an application and report its problems.
//!
//! 1. Locate the project and merge flags over `strand.toml`
//! 2. Compile the root library and everything it reaches
//! 3. Render the diagnostics the compiler reported
//! 4. Map the result to an exit code

use std::error::Error;
use std::sync::Arc;

use strand_cache::DiskArtifactStore;
use strand_compiler::{CompileStatus, Compiler, RecordingListener};
use strand_diagnostics::Diagnostic;
use strand_source::FileSourceProvider;

use crate::pipeline::{self, path_uri};
use crate::{CheckArgs, GlobalArgs};

/// Runs the `strand check` command and returns the process exit code.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = pipeline::load_project(global, &args.options)?;
    let entry = project.entry(args.entry.as_deref())?;
    if !entry.is_file() {
        return Err(format!("{} does not exist", entry.display()).into());
    }
    let mode = project.options.exit_mode;

    let artifacts = Arc::new(DiskArtifactStore::new(&project.options.output_dir));
    let compiler = Compiler::from_options(
        project.options.clone(),
        Arc::new(FileSourceProvider),
        artifacts,
    );
    let app = compiler.factory().for_uri(&path_uri(&entry));

    if !global.quiet {
        eprintln!("   Checking {app}");
    }

    let mut listener = RecordingListener::new();
    let result = match compiler.compile(&app, &mut listener) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(CompileStatus::Other.exit_code(mode));
        }
    };

    let diagnostics: Vec<Diagnostic> = listener.diagnostics().into_iter().cloned().collect();
    pipeline::report(&diagnostics, compiler.factory(), args.format, global);
    if let Some(message) = &result.message {
        if !global.quiet {
            eprintln!("   {message}");
        }
    }

    Ok(result.exit_code(mode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OptionArgs, ReportFormat};
    use std::fs;
    use tempfile::TempDir;

    fn global(dir: &std::path::Path) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            color: false,
            config: Some(dir.to_path_buf()),
        }
    }

    fn project(app: &str) -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("strand.toml"),
            "[project]\nname = \"demo\"\nentry = \"app.st\"\n\n[exit]\nmode = \"extended\"\n",
        )
        .unwrap();
        fs::write(tmp.path().join("app.st"), app).unwrap();
        tmp
    }

    fn args() -> CheckArgs {
        CheckArgs {
            entry: None,
            format: ReportFormat::Json,
            options: OptionArgs::default(),
        }
    }

    #[test]
    fn clean_library_exits_zero() {
        let tmp = project("library app;\n\nmain() {}\n");
        assert_eq!(run(&args(), &global(tmp.path())).unwrap(), 0);
    }

    #[test]
    fn warnings_exit_one_in_extended_mode() {
        let tmp = project("library app;\nimport 'std:mirrors';\n\nmain() {}\n");
        assert_eq!(run(&args(), &global(tmp.path())).unwrap(), 1);
    }

    #[test]
    fn type_problems_fail_only_when_fatal() {
        let tmp = project("library app;\n\nmain() { return hole; }\n");
        assert_eq!(run(&args(), &global(tmp.path())).unwrap(), 0);
        let args = CheckArgs {
            options: OptionArgs {
                fatal_type_errors: true,
                ..OptionArgs::default()
            },
            ..args()
        };
        assert_eq!(run(&args, &global(tmp.path())).unwrap(), 2);
    }

    #[test]
    fn missing_entry_is_an_error() {
        let tmp = project("");
        let args = CheckArgs {
            entry: Some(tmp.path().join("gone.st")),
            ..args()
        };
        assert!(run(&args, &global(tmp.path())).is_err());
    }

    #[test]
    fn artifacts_land_in_output_dir() {
        let tmp = project("library app;\n\nmain() {}\n");
        let out = tmp.path().join("artifacts");
        let args = CheckArgs {
            options: OptionArgs {
                out: Some(out.clone()),
                incremental: true,
                ..OptionArgs::default()
            },
            ..args()
        };
        assert_eq!(run(&args, &global(tmp.path())).unwrap(), 0);
        assert!(out.is_dir());
    }
}
