//! Scoped start/terminate.

use futures_util::future::BoxFuture;

use crate::error::ExifToolError;

use super::ExifTool;

impl ExifTool {
    /// Start, run `f`, then terminate whether or not `f` succeeded.
    ///
    /// The error from `f` takes precedence over a termination error.
    ///
    /// ```no_run
    /// # async fn demo() -> Result<(), exiftool_supervisor::ExifToolError> {
    /// use futures_util::FutureExt;
    ///
    /// let mut tool = exiftool_supervisor::ExifTool::new()?;
    /// let version = tool
    ///     .scoped(|et| async move { et.execute(["-ver"]).await }.boxed())
    ///     .await?;
    /// # Ok(()) }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the start error, the error of `f`, or the termination error.
    pub async fn scoped<T, F>(&mut self, f: F) -> Result<T, ExifToolError>
    where
        F: for<'a> FnOnce(&'a mut ExifTool) -> BoxFuture<'a, Result<T, ExifToolError>>,
    {
        self.start().await?;
        let outcome = f(self).await;
        let stopped = self.terminate().await;

        let value = outcome?;
        stopped?;
        Ok(value)
    }
}
