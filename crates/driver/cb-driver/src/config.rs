//! Configuration file (`cbind.toml`) parsing

use anyhow::{Context, Result, bail};
use cb_duplicates::DuplicateDetector;
use cb_rust::BindingOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Contents of a `cbind.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Headers to read
    pub input: InputConfig,
    /// Where bindings go
    pub output: OutputConfig,
    /// Binding generation options
    pub bindings: BindingOptions,
    /// Duplicate detection options
    pub duplicates: DuplicatesConfig,
    /// Directory the configuration was loaded from
    #[serde(skip)]
    pub root: PathBuf,
}

/// `[input]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Header paths, relative to the configuration file
    pub headers: Vec<PathBuf>,
}

/// `[output]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Output file; standard output when absent
    pub path: Option<PathBuf>,
}

/// `[duplicates]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DuplicatesConfig {
    /// Treat redeclarations differing only in `const` as duplicates
    pub ignore_qualifiers: bool,
}

/// Settings given on the command line; they win over the file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Headers, relative to the working directory
    pub headers: Vec<PathBuf>,
    /// Output file
    pub output: Option<PathBuf>,
    /// Library for the `#[link]` attribute
    pub link: Option<String>,
    /// Item name patterns
    pub allowlist: Vec<String>,
    /// Path holding the C scalar types
    pub ctypes_prefix: Option<String>,
}

/// Everything a binding generation run needs, after precedence is applied
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    /// Headers to compile, in order
    pub headers: Vec<PathBuf>,
    /// Output file; standard output when absent
    pub output: Option<PathBuf>,
    /// Binding options
    pub bindings: BindingOptions,
    /// Duplicate detection for the session
    pub detector: DuplicateDetector,
}

impl Config {
    /// Name of the configuration file
    pub const FILE_NAME: &'static str = "cbind.toml";

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    /// Find configuration in a directory (looks for `cbind.toml`)
    pub fn find_in_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(Self::FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        Self::from_file(&path).map(Some)
    }

    /// Load `explicit` when given, else `cbind.toml` in `dir`, else defaults
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => Ok(Self::find_in_dir(dir)?.unwrap_or_default()),
        }
    }

    /// Combine the file with command-line `overrides`
    pub fn plan(self, overrides: Overrides) -> Result<GenerationPlan> {
        let headers = if overrides.headers.is_empty() {
            self.header_paths()
        } else {
            overrides.headers
        };
        if headers.is_empty() {
            bail!("No headers given and none listed in {}", Self::FILE_NAME);
        }

        let detector = self.detector();
        let output = overrides.output.or_else(|| self.output_path());
        let mut bindings = self.bindings;
        if let Some(link) = overrides.link {
            bindings.link_name = Some(link);
        }
        if !overrides.allowlist.is_empty() {
            bindings.allowlist = overrides.allowlist;
        }
        if let Some(prefix) = overrides.ctypes_prefix {
            bindings.ctypes_prefix = prefix;
        }

        Ok(GenerationPlan {
            headers,
            output,
            bindings,
            detector,
        })
    }

    /// Header paths resolved against the configuration directory
    pub fn header_paths(&self) -> Vec<PathBuf> {
        self.input
            .headers
            .iter()
            .map(|header| self.root.join(header))
            .collect()
    }

    /// Output path resolved against the configuration directory
    pub fn output_path(&self) -> Option<PathBuf> {
        self.output.path.as_ref().map(|path| self.root.join(path))
    }

    /// Duplicate detector configured by `[duplicates]`
    pub fn detector(&self) -> DuplicateDetector {
        DuplicateDetector::new().with_ignore_qualifiers(self.duplicates.ignore_qualifiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_full_config() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(
            dir.path().join(Config::FILE_NAME),
            r#"
[input]
headers = ["include/main.h"]

[output]
path = "bindings.rs"

[bindings]
ctypes-prefix = "libc"
link = "cgotest"
allowlist = ["add", "global*"]
complex-type = "Complex"

[duplicates]
ignore-qualifiers = true
"#,
        )?;

        let config = Config::find_in_dir(dir.path())?.context("config not found")?;
        assert_eq!(config.header_paths(), vec![dir.path().join("include/main.h")]);
        assert_eq!(config.output_path(), Some(dir.path().join("bindings.rs")));
        assert_eq!(config.bindings.ctypes_prefix, "libc");
        assert_eq!(config.bindings.link_name.as_deref(), Some("cgotest"));
        assert_eq!(config.bindings.allowlist, vec!["add", "global*"]);
        assert_eq!(config.bindings.complex_type, "Complex");
        assert!(config.duplicates.ignore_qualifiers);
        Ok(())
    }

    #[test]
    fn test_empty_config_uses_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join(Config::FILE_NAME), "")?;

        let config = Config::find_in_dir(dir.path())?.context("config not found")?;
        assert!(config.header_paths().is_empty());
        assert_eq!(config.output_path(), None);
        assert_eq!(config.bindings, BindingOptions::default());
        Ok(())
    }

    #[test]
    fn test_missing_config() -> Result<()> {
        let dir = TempDir::new()?;
        assert_eq!(Config::find_in_dir(dir.path())?, None);
        Ok(())
    }

    const CONFIG: &str = r#"
[input]
headers = ["main.h"]

[output]
path = "bindings.rs"

[bindings]
link = "cgotest"
allowlist = ["add"]
"#;

    #[test]
    fn test_plan_takes_headers_from_config() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join(Config::FILE_NAME), CONFIG)?;

        let plan = Config::load(None, dir.path())?.plan(Overrides::default())?;
        assert_eq!(plan.headers, vec![dir.path().join("main.h")]);
        assert_eq!(plan.output, Some(dir.path().join("bindings.rs")));
        assert_eq!(plan.bindings.link_name.as_deref(), Some("cgotest"));
        assert_eq!(plan.bindings.allowlist, vec!["add"]);
        Ok(())
    }

    #[test]
    fn test_command_line_overrides_config() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join(Config::FILE_NAME), CONFIG)?;

        let overrides = Overrides {
            headers: vec![PathBuf::from("other.h")],
            output: Some(PathBuf::from("out.rs")),
            link: Some("m".to_string()),
            allowlist: vec!["glob*".to_string()],
            ctypes_prefix: Some("libc".to_string()),
        };
        let plan = Config::load(None, dir.path())?.plan(overrides)?;
        assert_eq!(plan.headers, vec![PathBuf::from("other.h")]);
        assert_eq!(plan.output, Some(PathBuf::from("out.rs")));
        assert_eq!(plan.bindings.link_name.as_deref(), Some("m"));
        assert_eq!(plan.bindings.allowlist, vec!["glob*"]);
        assert_eq!(plan.bindings.ctypes_prefix, "libc");
        Ok(())
    }

    #[test]
    fn test_explicit_config_wins_over_directory() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join(Config::FILE_NAME), CONFIG)?;
        let elsewhere = TempDir::new()?;
        let explicit = elsewhere.path().join("custom.toml");
        fs::write(&explicit, "[input]\nheaders = [\"api.h\"]\n")?;

        let plan = Config::load(Some(&explicit), dir.path())?.plan(Overrides::default())?;
        assert_eq!(plan.headers, vec![elsewhere.path().join("api.h")]);
        assert_eq!(plan.output, None);
        assert_eq!(plan.bindings.link_name, None);
        Ok(())
    }

    #[test]
    fn test_plan_without_headers_fails() -> Result<()> {
        let dir = TempDir::new()?;

        let error = match Config::load(None, dir.path())?.plan(Overrides::default()) {
            Ok(plan) => panic!("expected an error, got {plan:?}"),
            Err(error) => error,
        };
        assert!(error.to_string().starts_with("No headers given"));
        Ok(())
    }

    #[test]
    fn test_unknown_key_is_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join(Config::FILE_NAME);
        fs::write(&path, "[bindings]\nprefix = \"libc\"\n")?;

        let error = match Config::from_file(&path) {
            Ok(config) => panic!("expected an error, got {config:?}"),
            Err(error) => error,
        };
        assert!(error.to_string().starts_with("Failed to parse config file"));
        Ok(())
    }
}
