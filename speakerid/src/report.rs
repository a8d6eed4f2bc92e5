//! Report output: accuracy line append and JSON run reports.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::IdentifyError;
use crate::runner::{RunReport, Summary};

/// Formats the one-line accuracy record.
pub fn accuracy_line(summary: &Summary) -> String {
    format!(
        "Accuracy {:.2} evaluated={} correct={} skipped={}",
        summary.accuracy, summary.evaluated, summary.correct, summary.skipped
    )
}

/// Appends the accuracy record to `path`, creating the file and its parent
/// directories if needed.
pub fn append_accuracy(path: impl AsRef<Path>, summary: &Summary) -> Result<(), IdentifyError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", accuracy_line(summary))?;
    Ok(())
}

/// Save report to file.
pub fn save_report(report: &RunReport, path: impl AsRef<Path>) -> Result<(), IdentifyError> {
    let path = path.as_ref();
    let data = serde_json::to_string_pretty(report).map_err(|e| IdentifyError::format(path, e))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

/// Load report from file.
pub fn load_report(path: impl AsRef<Path>) -> Result<RunReport, IdentifyError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| IdentifyError::missing(path, e))?;
    serde_json::from_slice(&data).map_err(|e| IdentifyError::format(path, e))
}
