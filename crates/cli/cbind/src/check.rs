//! Check command implementation

use anyhow::Result;
use cb_duplicates::DuplicateDetector;
use colored::Colorize;
use std::path::PathBuf;

pub fn check(headers: &[PathBuf]) -> Result<()> {
    println!("{} {} headers", "Checking".green().bold(), headers.len());

    let session = crate::compiler::compile_headers(headers, DuplicateDetector::new())?;
    crate::compiler::print_reports(&session);

    for file in session.files() {
        println!("  {} {}", "Checked:".bold(), file.name);
    }
    println!("  {} {} declarations", "Found:".bold(), session.table().len());
    if !session.duplicates().is_empty() {
        println!(
            "  {} {} redeclarations",
            "Note:".yellow().bold(),
            session.duplicates().len()
        );
    }

    let total_errors = session.reports().len();
    println!();
    if total_errors == 0 {
        println!("{} No errors found", "Success:".green().bold());
        Ok(())
    } else {
        eprintln!("{} {} errors found", "Failed:".red().bold(), total_errors);
        anyhow::bail!("Check failed with {} errors", total_errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_check_fails_on_errors() -> Result<()> {
        let dir = TempDir::new()?;
        let good = dir.path().join("good.h");
        let bad = dir.path().join("bad.h");
        fs::write(&good, "int add(int a, int b);\nint add(int a, int b);\n")?;
        fs::write(&bad, "long add(int a, int b);\n")?;

        check(std::slice::from_ref(&good))?;
        assert!(check(&[good, bad]).is_err());
        Ok(())
    }
}
