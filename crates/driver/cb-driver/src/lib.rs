//! Compilation driver and high-level APIs
//!
//! A [`Session`] runs headers through the whole pipeline: parsing, lowering,
//! duplicate detection and, on request, binding generation. Headers added to
//! the same session share typedefs and a single declaration table.

pub mod config;

pub use config::{Config, GenerationPlan, Overrides};

use anyhow::{Context, Result};
use cb_decl::{DeclClass, DeclTable, LowerError, LoweringContext, TypeCategory};
use cb_duplicates::{ConflictError, DuplicateDetector, Redeclaration};
use cb_intern::Interner;
use cb_parser::{ParseError, TypedefNames};
use cb_rust::{BindingOptions, GenerateError};
use cb_span::{FileId, FileSpan, LineIndex};
use miette::{NamedSource, Report};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// A header added to a session
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File identifier used in spans
    pub id: FileId,
    /// Display name, usually the path
    pub name: String,
    /// Full text
    pub text: String,
    /// Line lookup for the text
    pub line_index: LineIndex,
}

impl SourceFile {
    fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.name, self.text.clone())
    }
}

/// A lowering error together with the file it occurred in
#[derive(Debug, Clone)]
pub struct FileLowerError {
    /// File the declaration is in
    pub file: FileId,
    /// The error
    pub error: LowerError,
}

/// A file name and line, for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// File name as added to the session
    pub file: String,
    /// Line (1-based)
    pub line: usize,
}

/// Serializable description of one declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclSummary {
    /// Declared name
    pub name: String,
    /// Typedef, function or global
    pub kind: DeclClass,
    /// Declared type in C syntax
    pub c_type: String,
    /// Category after typedef resolution
    pub category: TypeCategory,
    /// File of the first declaration
    pub file: String,
    /// Line of the first declaration (1-based)
    pub line: usize,
    /// Values of this type can be called
    pub callable: bool,
    /// A pointer through which a callee can write a scalar
    pub out_param: bool,
}

/// Headers compiled into one declaration table
#[derive(Debug)]
pub struct Session {
    typedef_names: TypedefNames,
    lowering: LoweringContext,
    table: DeclTable,
    detector: DuplicateDetector,
    files: Vec<SourceFile>,
    parse_errors: Vec<ParseError>,
    lower_errors: Vec<FileLowerError>,
    duplicates: Vec<Redeclaration>,
    conflicts: Vec<ConflictError>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a session with default duplicate detection
    pub fn new() -> Self {
        Self::with_detector(DuplicateDetector::new())
    }

    /// Create a session using `detector` to classify redeclarations
    pub fn with_detector(detector: DuplicateDetector) -> Self {
        let interner = Interner::new();
        Self {
            typedef_names: TypedefNames::with_builtins(),
            lowering: LoweringContext::new(interner.clone()),
            table: DeclTable::new(interner),
            detector,
            files: Vec::new(),
            parse_errors: Vec::new(),
            lower_errors: Vec::new(),
            duplicates: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Read and compile a header from disk
    pub fn add_file(&mut self, path: &Path) -> Result<FileId> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read header: {}", path.display()))?;
        Ok(self.add_source(&path.display().to_string(), text))
    }

    /// Compile a header held in memory
    #[instrument(skip(self, text))]
    pub fn add_source(&mut self, name: &str, text: String) -> FileId {
        let id = FileId::new(self.files.len() as u32);
        info!("compiling header");

        let parsed = cb_parser::parse_header(name, &text, &mut self.typedef_names);
        let lowered = self.lowering.lower_unit(&parsed.unit, id);
        debug!(
            declarations = lowered.decls.len(),
            parse_errors = parsed.errors.len(),
            lower_errors = lowered.errors.len(),
            "lowered header"
        );

        let outcome = self.detector.merge(&mut self.table, lowered.decls);
        for conflict in &outcome.conflicts {
            warn!(name = %conflict.name, reason = %conflict.reason, "conflicting redeclaration");
        }

        self.parse_errors.extend(parsed.errors);
        self.lower_errors.extend(
            lowered
                .errors
                .into_iter()
                .map(|error| FileLowerError { file: id, error }),
        );
        self.duplicates.extend(outcome.duplicates);
        self.conflicts.extend(outcome.conflicts);
        self.files.push(SourceFile {
            id,
            name: name.to_string(),
            line_index: LineIndex::new(&text),
            text,
        });
        id
    }

    /// The merged declaration table
    pub fn table(&self) -> &DeclTable {
        &self.table
    }

    /// Headers in the order they were added
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Look up a header by id
    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    /// Syntax errors across all headers
    pub fn parse_errors(&self) -> &[ParseError] {
        &self.parse_errors
    }

    /// Declarations that parsed but could not be lowered
    pub fn lower_errors(&self) -> &[FileLowerError] {
        &self.lower_errors
    }

    /// Harmless redeclarations
    pub fn duplicates(&self) -> &[Redeclaration] {
        &self.duplicates
    }

    /// Redeclarations that disagree with the first declaration
    pub fn conflicts(&self) -> &[ConflictError] {
        &self.conflicts
    }

    /// Whether any parse, lowering or conflict error was found
    pub fn has_errors(&self) -> bool {
        !self.parse_errors.is_empty() || !self.lower_errors.is_empty() || !self.conflicts.is_empty()
    }

    /// Every error as a report ready for rendering
    pub fn reports(&self) -> Vec<Report> {
        let mut reports: Vec<Report> = self
            .parse_errors
            .iter()
            .cloned()
            .map(Report::new)
            .collect();

        for lower in &self.lower_errors {
            reports.push(self.with_source(Report::new(lower.error.clone()), lower.file));
        }
        for conflict in &self.conflicts {
            reports.push(self.with_source(Report::new(conflict.clone()), conflict.location.file));
        }
        reports
    }

    fn with_source(&self, report: Report, file: FileId) -> Report {
        match self.file(file) {
            Some(source) => report.with_source_code(source.named_source()),
            None => report,
        }
    }

    /// Line (1-based) of a byte offset in a header
    pub fn line_of(&self, file: FileId, offset: u32) -> usize {
        self.file(file)
            .map_or(0, |source| source.line_index.line_col(offset).0)
    }

    /// File name and line of a span
    pub fn locate(&self, span: FileSpan) -> Location {
        Location {
            file: self
                .file(span.file)
                .map(|source| source.name.clone())
                .unwrap_or_default(),
            line: self.line_of(span.file, span.span.start),
        }
    }

    /// Summaries of every declaration in the table
    pub fn summaries(&self) -> Vec<DeclSummary> {
        self.table
            .iter()
            .map(|decl| {
                let ty = decl.kind.ty();
                let Location { file, line } = self.locate(decl.span);
                DeclSummary {
                    name: self.table.name(decl.name).to_string(),
                    kind: decl.kind.class(),
                    c_type: self.table.display_type(&ty),
                    category: self.table.category(&ty),
                    file,
                    line,
                    callable: self.table.is_callable(&ty),
                    out_param: self.table.is_out_param(&ty),
                }
            })
            .collect()
    }

    /// Rust bindings for the merged table
    pub fn generate_bindings(&self, options: &BindingOptions) -> Result<String, GenerateError> {
        cb_rust::generate(&self.table, options)
    }
}
