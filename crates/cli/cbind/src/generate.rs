//! Generate command implementation

use anyhow::{Context, Result};
use cb_driver::{Config, Overrides};
use colored::Colorize;
use std::path::Path;
use tracing::info;

pub fn generate(config: Option<&Path>, overrides: Overrides) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let plan = Config::load(config, &cwd)?.plan(overrides)?;

    let session = crate::compiler::compile_headers(&plan.headers, plan.detector)?;
    crate::compiler::print_reports(&session);

    let syntax_errors = session.parse_errors().len() + session.lower_errors().len();
    if syntax_errors > 0 {
        anyhow::bail!("Generation failed with {} errors", syntax_errors);
    }

    let bindings = session
        .generate_bindings(&plan.bindings)
        .map_err(|error| anyhow::anyhow!("{:?}", miette::Report::new(error)))?;

    match plan.output {
        Some(path) => {
            std::fs::write(&path, &bindings)
                .with_context(|| format!("Failed to write bindings: {}", path.display()))?;
            info!(path = %path.display(), "wrote bindings");
            eprintln!(
                "{} {} declarations to {}",
                "Generated".green().bold(),
                session.table().len(),
                path.display()
            );
        }
        None => print!("{bindings}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generate_writes_output_file() -> Result<()> {
        let dir = TempDir::new()?;
        let header = dir.path().join("api.h");
        let output = dir.path().join("bindings.rs");
        fs::write(&header, "int add(int a, int b);\n")?;

        let config = dir.path().join("cbind.toml");
        fs::write(&config, "")?;
        let overrides = Overrides {
            headers: vec![header],
            output: Some(output.clone()),
            link: Some("api".to_string()),
            ..Overrides::default()
        };
        generate(Some(&config), overrides)?;

        let written = fs::read_to_string(&output)?;
        assert!(written.contains("#[link(name = \"api\")]"));
        assert!(written.contains("pub fn add("));
        Ok(())
    }

    #[test]
    fn test_generate_stops_on_syntax_errors() -> Result<()> {
        let dir = TempDir::new()?;
        let header = dir.path().join("bad.h");
        let config = dir.path().join("cbind.toml");
        fs::write(&header, "short double broken;\n")?;
        fs::write(&config, "")?;

        let overrides = Overrides {
            headers: vec![header],
            output: Some(dir.path().join("bindings.rs")),
            ..Overrides::default()
        };
        assert!(generate(Some(&config), overrides).is_err());
        assert!(!dir.path().join("bindings.rs").exists());
        Ok(())
    }
}
