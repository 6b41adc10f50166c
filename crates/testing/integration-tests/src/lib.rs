//! Integration test utilities for cbind

use anyhow::{Context, Result};
use cb_decl::TypeCategory;
use cb_driver::{DeclSummary, Session};
use cb_duplicates::DuplicateDetector;
use cb_rust::BindingOptions;
use std::fs;
use std::path::Path;

/// Test fixture helper
pub struct TestFixture {
    /// Session the headers are compiled into
    pub session: Session,
}

impl TestFixture {
    /// Creates a fixture with default duplicate detection
    #[must_use]
    pub fn new() -> Self {
        Self::with_detector(DuplicateDetector::new())
    }

    /// Creates a fixture classifying redeclarations with `detector`
    #[must_use]
    pub fn with_detector(detector: DuplicateDetector) -> Self {
        Self {
            session: Session::with_detector(detector),
        }
    }

    /// Adds a header held in memory
    pub fn add_header(&mut self, name: &str, contents: &str) -> &mut Self {
        self.session.add_source(name, contents.to_string());
        self
    }

    /// Loads every `.h` file of a directory, in file name order
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or a header cannot be read
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let mut headers = Vec::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "h") {
                headers.push(path);
            }
        }
        headers.sort();

        let mut fixture = Self::new();
        for header in &headers {
            fixture.session.add_file(header)?;
        }
        Ok(fixture)
    }

    /// Summary of the declaration called `name`
    #[must_use]
    pub fn summary(&self, name: &str) -> Option<DeclSummary> {
        self.session
            .summaries()
            .into_iter()
            .find(|summary| summary.name == name)
    }

    /// Category of the declaration called `name`
    #[must_use]
    pub fn category(&self, name: &str) -> Option<TypeCategory> {
        self.summary(name).map(|summary| summary.category)
    }

    /// Rendered bindings for everything compiled so far
    ///
    /// # Errors
    ///
    /// Returns an error if an item has no Rust representation
    pub fn bindings(&self, options: &BindingOptions) -> Result<String> {
        self.session
            .generate_bindings(options)
            .context("Failed to generate bindings")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
