//! Positional sanity check of per-file JSON results, with one restart-and-retry.

use crate::error::{ExecuteError, ExifToolError};
use crate::protocol::Param;

use super::{ExifTool, Metadata};

impl ExifTool {
    /// Run `-j <params> <files>` and return one record per file.
    ///
    /// With `resync` enabled, records are matched against `files` by
    /// position on their `SourceFile`. On a mismatch the process is
    /// restarted and the batch retried once; a second mismatch is returned
    /// as the error.
    ///
    /// # Errors
    ///
    /// Returns `ExecuteError::ResultCountMismatch` or
    /// `ExecuteError::SourceFileMismatch` when the retry is also misaligned,
    /// plus any error of [`ExifTool::execute_json`].
    pub async fn execute_json_files<S>(
        &mut self,
        files: &[S],
        params: &[&str],
    ) -> Result<Vec<Metadata>, ExifToolError>
    where
        S: AsRef<str>,
    {
        if files.is_empty() {
            return Err(ExifToolError::InvalidArgument("files cannot be empty"));
        }

        let batch: Vec<Param> = std::iter::once("-j")
            .chain(params.iter().copied())
            .chain(files.iter().map(AsRef::as_ref))
            .map(Param::from)
            .collect();

        let result = self.execute_json_params(&batch).await?;
        if !self.resync {
            return Ok(result);
        }

        let Err(mismatch) = check_source_files(files, &result) else {
            return Ok(result);
        };

        tracing::warn!(error = %mismatch, "Result does not match request, restarting exiftool");
        self.logger
            .warn(&format!("Method 'execute_json_files': {mismatch}; restarting and retrying"));
        self.terminate().await?;
        self.start().await?;

        let retry = self.execute_json_params(&batch).await?;
        check_source_files(files, &retry)?;
        Ok(retry)
    }
}

/// Compare returned `SourceFile` entries against the requested files, in order.
///
/// # Errors
///
/// Returns the first count or identity mismatch found.
pub fn check_source_files<S: AsRef<str>>(
    requested: &[S],
    result: &[Metadata],
) -> Result<(), ExecuteError> {
    if result.len() != requested.len() {
        return Err(ExecuteError::ResultCountMismatch {
            returned: result.len(),
            expected: requested.len(),
        });
    }

    for (record, requested) in result.iter().zip(requested) {
        let returned = record
            .get("SourceFile")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if returned != requested.as_ref() {
            return Err(ExecuteError::SourceFileMismatch {
                returned: returned.to_string(),
                requested: requested.as_ref().to_string(),
            });
        }
    }

    Ok(())
}
