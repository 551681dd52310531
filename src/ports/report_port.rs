//! Report generation port trait.

use crate::domain::error::ScreenerError;
use crate::domain::summary::ScreeningReport;
use std::path::Path;

/// Port for writing screening reports.
pub trait ReportPort {
    fn render(&self, report: &ScreeningReport) -> Result<String, ScreenerError>;

    fn write(&self, report: &ScreeningReport, output_path: &Path) -> Result<(), ScreenerError> {
        let rendered = self.render(report)?;
        std::fs::write(output_path, rendered).map_err(|e| ScreenerError::Report {
            reason: format!("cannot write {}: {}", output_path.display(), e),
        })
    }
}
