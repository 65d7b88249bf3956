//! JSON output of command results.

use lakesurveyor_core::Result;
use lakesurveyor_core::error::LakeSurveyorError;
use serde::Serialize;
use std::path::Path;

/// Serializes `value` as pretty JSON.
///
/// # Errors
/// Returns error if serialization fails
pub fn to_pretty_json<T>(value: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    serde_json::to_string_pretty(value).map_err(|e| LakeSurveyorError::Serialization {
        context: "command output".to_string(),
        source: e,
    })
}

/// Writes `value` as pretty JSON to `path`, or to stdout when no path is given.
///
/// # Errors
/// Returns error if serialization or the file write fails
pub async fn emit<T>(value: &T, path: Option<&Path>) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let json = to_pretty_json(value)?;
    match path {
        Some(path) => {
            tokio::fs::write(path, format!("{}\n", json))
                .await
                .map_err(|e| LakeSurveyorError::Io {
                    context: format!("Failed to write to {}", path.display()),
                    source: e,
                })?;
            tracing::info!("Output written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
