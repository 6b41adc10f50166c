//! Compiler helper for the CLI

use anyhow::Result;
use cb_driver::Session;
use cb_duplicates::DuplicateDetector;
use std::path::PathBuf;

/// Compile headers into one session, in order
pub fn compile_headers(headers: &[PathBuf], detector: DuplicateDetector) -> Result<Session> {
    let mut session = Session::with_detector(detector);
    for header in headers {
        session.add_file(header)?;
    }
    Ok(session)
}

/// Render every diagnostic of the session to stderr
pub fn print_reports(session: &Session) {
    for report in session.reports() {
        eprintln!("{report:?}");
    }
}
