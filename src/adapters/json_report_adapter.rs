//! JSON report adapter implementing ReportPort.

use crate::domain::error::ScreenerError;
use crate::domain::summary::ScreeningReport;
use crate::ports::report_port::ReportPort;

pub struct JsonReportAdapter {
    pretty: bool,
}

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for JsonReportAdapter {
    fn render(&self, report: &ScreeningReport) -> Result<String, ScreenerError> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        rendered.map_err(|e| ScreenerError::Report {
            reason: format!("JSON serialization failed: {}", e),
        })
    }
}
