//! `-j` output decoding.

use serde_json::Value;

use crate::error::{ExecuteError, ExifToolError};
use crate::protocol::Param;

use super::ExifTool;

/// One record of exiftool's JSON output, keyed by tag name.
pub type Metadata = serde_json::Map<String, Value>;

impl ExifTool {
    /// Run a batch with `-j` prepended and parse the JSON array on stdout.
    ///
    /// # Errors
    ///
    /// Returns `ExecuteError::OutputEmpty` if stdout is empty and
    /// `ExecuteError::JsonInvalid` if it does not parse, plus any error of
    /// [`ExifTool::execute`].
    pub async fn execute_json<I, P>(&mut self, params: I) -> Result<Vec<Metadata>, ExifToolError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        let params: Vec<Param> = std::iter::once(Param::from("-j"))
            .chain(params.into_iter().map(Into::into))
            .collect();
        self.execute_json_params(&params).await
    }

    pub(crate) async fn execute_json_params(
        &mut self,
        params: &[Param],
    ) -> Result<Vec<Metadata>, ExifToolError> {
        let result = self.execute_params(params).await?;
        if result.stdout.is_empty() {
            return Err(ExecuteError::OutputEmpty(Box::new(result.context(params))).into());
        }

        serde_json::from_str(&result.stdout_text()).map_err(|source| {
            ExecuteError::JsonInvalid {
                context: Box::new(result.context(params)),
                source,
            }
            .into()
        })
    }
}
