use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Header row written once, when the result file is created.
pub const HEADER: &str =
    "Model,Tokens,Batch size,Concurrency,Min (ms),Median (ms),P90 (ms),P99 (ms),Max (ms),Throughput";

/// Append-only CSV result log.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new<P>(path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends the given row, creating the file with [`HEADER`] if it does
    /// not exist yet.
    pub fn append(&self, row: &str) -> Result<(), io::Error> {
        let is_new = !fs::exists(&self.path)?;

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        if is_new {
            writeln!(file, "{HEADER}")?;
        }
        writeln!(file, "{row}")?;

        log::debug!("appended results to '{}'", self.path.display());

        Ok(())
    }
}
