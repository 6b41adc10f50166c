//! Parse command implementation

use crate::Format;
use anyhow::Result;
use cb_duplicates::DuplicateDetector;
use colored::Colorize;
use std::path::PathBuf;

pub fn list_declarations(headers: &[PathBuf], format: Format) -> Result<()> {
    let session = crate::compiler::compile_headers(headers, DuplicateDetector::new())?;
    crate::compiler::print_reports(&session);
    let summaries = session.summaries();

    match format {
        Format::Json => {
            let json = serde_json::to_string_pretty(&summaries)?;
            println!("{json}");
        }
        Format::Text => {
            for summary in &summaries {
                let mut traits = Vec::new();
                if summary.callable {
                    traits.push("callable");
                }
                if summary.out_param {
                    traits.push("out-param");
                }
                let traits = if traits.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", traits.join(", "))
                };

                let kind = format!("{:>8}", summary.kind.to_string());
                let location = format!("{}:{}", summary.file, summary.line);
                println!(
                    "{} {} : {} [{}]{traits}  {}",
                    kind.as_str().cyan(),
                    summary.name.as_str().bold(),
                    summary.c_type,
                    summary.category,
                    location.as_str().dimmed(),
                );
            }
            println!("\n  {} {} declarations", "Found:".bold(), summaries.len());
        }
    }

    Ok(())
}
