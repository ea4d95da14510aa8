//! Convenience calls built on the executor: reading and writing tags.
//!
//! These only translate arguments into exiftool parameters. Files are not
//! checked for existence and option semantics are left to exiftool.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ExifToolError;
use crate::executor::{ExifTool, Metadata};
use crate::protocol::Param;

/// Tag used by the keyword helpers.
pub const KEYWORDS_TAG: &str = "IPTC:Keywords";

static TAG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w*][\w:\-*]*#?$").expect("tag name pattern is valid"));

/// Value written to a tag. A list repeats the tag once per item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Single(String),
    List(Vec<String>),
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<Vec<String>> for TagValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for TagValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

/// How [`ExifTool::set_keywords`] changes the keyword list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordMode {
    /// `-TAG=value`
    Replace,
    /// `-TAG+=value`
    Add,
    /// `-TAG-=value`
    Remove,
}

impl KeywordMode {
    fn operator(self) -> &'static str {
        match self {
            Self::Replace => "=",
            Self::Add => "+=",
            Self::Remove => "-=",
        }
    }
}

/// Check a tag name against exiftool's naming rules (group prefix and `#` allowed).
#[must_use]
pub fn is_valid_tag_name(tag: &str) -> bool {
    TAG_NAME.is_match(tag)
}

/// # Errors
///
/// Returns `ExifToolError::TagName` for the first invalid name.
pub fn check_tag_list<'a, I>(tags: I) -> Result<(), ExifToolError>
where
    I: IntoIterator<Item = &'a str>,
{
    match tags.into_iter().find(|t| !is_valid_tag_name(t)) {
        Some(bad) => Err(ExifToolError::TagName(bad.to_string())),
        None => Ok(()),
    }
}

fn collect_files<F>(files: F) -> Result<Vec<Param>, ExifToolError>
where
    F: IntoIterator,
    F::Item: Into<Param>,
{
    let files: Vec<Param> = files.into_iter().map(Into::into).collect();
    if files.is_empty() {
        return Err(ExifToolError::InvalidArgument("files cannot be empty"));
    }
    Ok(files)
}

fn option_params<'a>(params: &'a [&'a str]) -> impl Iterator<Item = Param> + 'a {
    params.iter().map(|p| Param::from(*p))
}

impl ExifTool {
    /// All metadata for the given files.
    ///
    /// # Errors
    ///
    /// Returns `ExifToolError::InvalidArgument` for an empty file list, plus
    /// any error of [`ExifTool::execute_json`].
    pub async fn get_metadata<F>(
        &mut self,
        files: F,
        params: &[&str],
    ) -> Result<Vec<Metadata>, ExifToolError>
    where
        F: IntoIterator,
        F::Item: Into<Param>,
    {
        self.get_tags(files, &[], params).await
    }

    /// The given tags for the given files; an empty tag list returns everything.
    ///
    /// # Errors
    ///
    /// Returns `ExifToolError::TagName` for an invalid tag when
    /// `check_tag_names` is set, plus the errors of [`ExifTool::get_metadata`].
    pub async fn get_tags<F>(
        &mut self,
        files: F,
        tags: &[&str],
        params: &[&str],
    ) -> Result<Vec<Metadata>, ExifToolError>
    where
        F: IntoIterator,
        F::Item: Into<Param>,
    {
        let files = collect_files(files)?;
        if self.check_tag_names() {
            check_tag_list(tags.iter().copied())?;
        }

        let batch: Vec<Param> = option_params(params)
            .chain(tags.iter().map(|t| Param::Text(format!("-{t}"))))
            .chain(files)
            .collect();
        self.execute_json(batch).await
    }

    /// Write tag values to the given files and return exiftool's summary.
    ///
    /// # Errors
    ///
    /// Returns `ExifToolError::InvalidArgument` for empty files or tags,
    /// `ExifToolError::TagName` for an invalid tag, plus any error of
    /// [`ExifTool::execute`].
    pub async fn set_tags<F>(
        &mut self,
        files: F,
        tags: &[(&str, TagValue)],
        params: &[&str],
    ) -> Result<String, ExifToolError>
    where
        F: IntoIterator,
        F::Item: Into<Param>,
    {
        let files = collect_files(files)?;
        if tags.is_empty() {
            return Err(ExifToolError::InvalidArgument("tags cannot be empty"));
        }
        if self.check_tag_names() {
            check_tag_list(tags.iter().map(|(tag, _)| *tag))?;
        }

        let mut batch: Vec<Param> = option_params(params).collect();
        for (tag, value) in tags {
            match value {
                TagValue::Single(v) => batch.push(Param::Text(format!("-{tag}={v}"))),
                TagValue::List(items) => {
                    batch.extend(items.iter().map(|v| Param::Text(format!("-{tag}={v}"))));
                }
            }
        }
        batch.extend(files);
        self.execute(batch).await
    }

    /// Replace, add to, or remove from `IPTC:Keywords`.
    ///
    /// # Errors
    ///
    /// Returns `ExifToolError::InvalidArgument` for an empty file list, plus
    /// any error of [`ExifTool::execute`].
    pub async fn set_keywords<F>(
        &mut self,
        files: F,
        mode: KeywordMode,
        keywords: &[&str],
    ) -> Result<String, ExifToolError>
    where
        F: IntoIterator,
        F::Item: Into<Param>,
    {
        let files = collect_files(files)?;
        let op = mode.operator();
        let batch: Vec<Param> = keywords
            .iter()
            .map(|k| Param::Text(format!("-{KEYWORDS_TAG}{op}{k}")))
            .chain(files)
            .collect();
        self.execute(batch).await
    }
}
