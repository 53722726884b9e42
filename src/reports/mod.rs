use std::{
    fs::File,
    path::{Path, PathBuf},
};

use crate::error::EpiError;

pub mod summary_report;
pub mod timeline_report;

/// Where report files go and whether existing files may be replaced. A report named `name`
/// is written to `directory/{file_prefix}{name}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOptions {
    pub directory: PathBuf,
    pub file_prefix: String,
    pub overwrite: bool,
}

impl ReportOptions {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        ReportOptions {
            directory: directory.into(),
            ..ReportOptions::default()
        }
    }

    #[must_use]
    pub fn file_prefix(mut self, file_prefix: impl Into<String>) -> Self {
        self.file_prefix = file_prefix.into();
        self
    }

    #[must_use]
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub fn report_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}{name}", self.file_prefix))
    }

    /// Resolves the path for report `name`, refusing to clobber an existing file unless
    /// `overwrite` is set.
    /// # Errors
    /// - `OutputExists` if the file exists and `overwrite` is false.
    pub fn writable_path(&self, name: &str) -> Result<PathBuf, EpiError> {
        self.check_writable(self.report_path(name))
    }

    /// Applies the overwrite rule to an output file that is not named like a report.
    /// # Errors
    /// - `OutputExists` if the file exists and `overwrite` is false.
    pub fn check_writable(&self, path: PathBuf) -> Result<PathBuf, EpiError> {
        if !self.overwrite && path.exists() {
            return Err(EpiError::OutputExists(path));
        }
        Ok(path)
    }
}

/// Opens a CSV writer at `path`, creating the parent directory if needed.
pub(crate) fn create_csv_writer(path: &Path) -> Result<csv::Writer<File>, EpiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(csv::Writer::from_path(path)?)
}
