//! Duplicates command implementation

use crate::Format;
use anyhow::Result;
use cb_driver::Location;
use cb_duplicates::{ConflictReason, DuplicateDetector};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct DuplicateEntry {
    name: String,
    kind: String,
    first: Location,
    second: Location,
}

#[derive(Serialize)]
struct ConflictEntry {
    name: String,
    reason: ConflictReason,
    first: Location,
    second: Location,
}

#[derive(Serialize)]
struct Report {
    duplicates: Vec<DuplicateEntry>,
    conflicts: Vec<ConflictEntry>,
}

pub fn report_duplicates(headers: &[PathBuf], format: Format, ignore_qualifiers: bool) -> Result<()> {
    let detector = DuplicateDetector::new().with_ignore_qualifiers(ignore_qualifiers);
    let session = crate::compiler::compile_headers(headers, detector)?;

    let report = Report {
        duplicates: session
            .duplicates()
            .iter()
            .map(|dup| DuplicateEntry {
                name: dup.name.clone(),
                kind: dup.kind.to_string(),
                first: session.locate(dup.first),
                second: session.locate(dup.second),
            })
            .collect(),
        conflicts: session
            .conflicts()
            .iter()
            .map(|conflict| ConflictEntry {
                name: conflict.name.clone(),
                reason: conflict.reason,
                first: session.locate(conflict.first),
                second: session.locate(conflict.location),
            })
            .collect(),
    };

    match format {
        Format::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{json}");
        }
        Format::Text => {
            if report.duplicates.is_empty() {
                println!("{} No redeclarations found", "Success:".green().bold());
            } else {
                println!(
                    "{} {} redeclarations:\n",
                    "Found".yellow().bold(),
                    report.duplicates.len()
                );
                for (index, dup) in report.duplicates.iter().enumerate() {
                    println!("{}. {} `{}`", index + 1, dup.kind, dup.name.as_str().bold());
                    println!("   First declaration:  {}:{}", dup.first.file, dup.first.line);
                    println!("   Redeclared at:      {}:{}", dup.second.file, dup.second.line);
                }
            }

            if !report.conflicts.is_empty() {
                println!();
                crate::compiler::print_reports(&session);
                eprintln!(
                    "{} {} conflicting redeclarations",
                    "Failed:".red().bold(),
                    report.conflicts.len()
                );
            }
        }
    }

    if !report.conflicts.is_empty() {
        anyhow::bail!("{} conflicting redeclarations", report.conflicts.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_conflicts_fail_the_command() -> Result<()> {
        let dir = TempDir::new()?;
        let header = dir.path().join("api.h");
        fs::write(&header, "extern int limit;\nextern const int limit;\n")?;

        assert!(report_duplicates(std::slice::from_ref(&header), Format::Json, false).is_err());
        report_duplicates(&[header], Format::Text, true)?;
        Ok(())
    }
}
