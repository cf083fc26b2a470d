//! Settings shared by every job of a benchmark run.

use crate::error::{Err, Result};
use log::info;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const HOME_KEY: &str = "openg.home";
pub const NUM_WORKER_THREADS_KEY: &str = "openg.num-worker-threads";
pub const INTERMEDIATE_DIR_KEY: &str = "openg.intermediate-dir";
pub const OUTPUT_DIR_KEY: &str = "openg.output-dir";

/// Per-job settings for the engine process.
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfiguration {
    pub binary_dir: PathBuf,
    pub num_worker_threads: Option<i64>,
    /// Kill the engine if it runs longer than this. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl JobConfiguration {
    pub fn new<P: Into<PathBuf>>(binary_dir: P) -> Self {
        Self {
            binary_dir: binary_dir.into(),
            num_worker_threads: None,
            timeout: None,
        }
    }

    pub fn num_worker_threads(mut self, num_worker_threads: i64) -> Self {
        self.num_worker_threads = Some(num_worker_threads);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The `--threadnum` value: the configured count, or 1 if unset or non-positive.
    pub fn threads(&self) -> i64 {
        match self.num_worker_threads {
            Some(n) if n > 0 => n,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub home: PathBuf,
    pub intermediate_dir: PathBuf,
    pub output_dir: PathBuf,
    pub job: JobConfiguration,
}

impl PlatformConfig {
    /// The engine binaries live in `<home>/bin`.
    pub fn new<H, I, O>(home: H, intermediate_dir: I, output_dir: O) -> Self
    where
        H: Into<PathBuf>,
        I: Into<PathBuf>,
        O: Into<PathBuf>,
    {
        let home = home.into();
        let job = JobConfiguration::new(home.join("bin"));
        Self {
            home,
            intermediate_dir: intermediate_dir.into(),
            output_dir: output_dir.into(),
            job,
        }
    }

    pub fn job(mut self, job: JobConfiguration) -> Self {
        self.job = job;
        self
    }

    /// Makes sure every configured directory exists, creating missing ones.
    pub fn validate(&self) -> Result<()> {
        if !self.job.binary_dir.is_dir() {
            return Err(Err::ConfigurationError(format!(
                "binary directory \"{}\" derived from \"{}\" does not exist",
                self.job.binary_dir.display(),
                HOME_KEY
            )));
        }
        ensure_directory_exists(&self.intermediate_dir, INTERMEDIATE_DIR_KEY)?;
        ensure_directory_exists(&self.output_dir, OUTPUT_DIR_KEY)
    }
}

pub fn ensure_directory_exists(directory: &Path, property: &str) -> Result<()> {
    if directory.exists() {
        if !directory.is_dir() {
            return Err(Err::ConfigurationError(format!(
                "path \"{}\" set as property \"{}\" already exists, but is not a directory",
                directory.display(),
                property
            )));
        }
        return Ok(());
    }
    fs::create_dir_all(directory).map_err(|e| {
        Err::ConfigurationError(format!(
            "unable to create directory \"{}\" set as property \"{}\": {}",
            directory.display(),
            property,
            e
        ))
    })?;
    info!(
        "created directory \"{}\" and any missing parent directories",
        directory.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_threads() {
        let job = JobConfiguration::new("bin");
        assert_eq!(job.threads(), 1);
        assert_eq!(job.clone().num_worker_threads(0).threads(), 1);
        assert_eq!(job.clone().num_worker_threads(-4).threads(), 1);
        assert_eq!(job.num_worker_threads(8).threads(), 8);
    }

    #[test]
    fn test_validate_creates_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        let config = PlatformConfig::new(
            dir.path(),
            dir.path().join("a/intermediate"),
            dir.path().join("b/output"),
        );
        assert_eq!(config.job.binary_dir, dir.path().join("bin"));
        config.validate().unwrap();
        assert!(config.intermediate_dir.is_dir());
        assert!(config.output_dir.is_dir());
    }

    #[test]
    fn test_validate_rejects_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("output"), "").unwrap();
        let config = PlatformConfig::new(dir.path(), dir.path(), dir.path().join("output"));
        assert!(matches!(
            config.validate(),
            Err(Err::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_binaries() {
        let dir = TempDir::new().unwrap();
        let config = PlatformConfig::new(dir.path().join("missing"), dir.path(), dir.path());
        assert!(matches!(
            config.validate(),
            Err(Err::ConfigurationError(_))
        ));
    }
}
