//! Configuration types deserialized from `strand.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

/// The top-level configuration parsed from `strand.toml`.
#[derive(Debug, Deserialize)]
pub struct StrandConfig {
    /// Project metadata and the root library.
    pub project: ProjectMeta,
    /// Analysis switches.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Where persisted artifacts go.
    #[serde(default)]
    pub output: OutputConfig,
    /// Search roots for `package:` URIs.
    #[serde(default)]
    pub packages: PackagesConfig,
    /// System library location and implicit imports.
    #[serde(default)]
    pub system: SystemConfig,
    /// Process exit code mapping.
    #[serde(default)]
    pub exit: ExitConfig,
}

/// Core project metadata required in every `strand.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// Path of the root library, relative to the project directory.
    pub entry: String,
}

/// Switches controlling incremental analysis and error fatality.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Reuse timestamps and dependency records to diet-parse unchanged units.
    #[serde(default)]
    pub incremental: bool,
    /// Continue into resolution when parse errors were reported.
    #[serde(default)]
    pub resolve_despite_parse_errors: bool,
    /// Count static type problems as errors in the compile result.
    #[serde(default)]
    pub type_errors_are_fatal: bool,
    /// Count warnings as errors in the compile result.
    #[serde(default)]
    pub warnings_are_fatal: bool,
}

/// Output settings.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Artifact directory, relative to the project directory.
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "out".to_string()
}

/// Package root settings.
#[derive(Debug, Default, Deserialize)]
pub struct PackagesConfig {
    /// Directories searched in order for `package:` URIs.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub roots: Vec<String>,
}

/// System library settings.
#[derive(Debug, Deserialize)]
pub struct SystemConfig {
    /// Directory holding system library sources. The embedded copies are used
    /// when absent.
    #[serde(default)]
    pub sdk: Option<String>,
    /// Libraries every library imports implicitly (e.g. `"std:core"` or
    /// `["std:core", "std:io"]`).
    #[serde(
        default = "default_embedded",
        deserialize_with = "deserialize_string_or_vec"
    )]
    pub embedded: Vec<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            sdk: None,
            embedded: default_embedded(),
        }
    }
}

fn default_embedded() -> Vec<String> {
    vec!["std:core".to_string()]
}

/// Exit code settings.
#[derive(Debug, Default, Deserialize)]
pub struct ExitConfig {
    /// How compile results map to process exit codes.
    #[serde(default)]
    pub mode: ExitCodeMode,
}

/// How compile results map to process exit codes.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExitCodeMode {
    /// Errors exit with 1, everything else with 0 (default).
    #[default]
    Collapse,
    /// OK 0, warnings 1, errors 2, other 127.
    Extended,
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows `roots = "packages"` as well as `roots = ["packages", "vendor"]`.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
