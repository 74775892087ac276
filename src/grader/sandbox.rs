//! Scoped grading sandbox.
//!
//! A thin wrapper around `tempfile::TempDir`. Dropping the sandbox removes
//! the directory, so cleanup holds on every exit path, including panics in
//! the grading code above it.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::GradeError;

pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn create() -> Result<Self, GradeError> {
        let dir = tempfile::Builder::new()
            .prefix("agent-bench-grade-")
            .tempdir()
            .map_err(|e| GradeError::Setup(e.to_string()))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file into the sandbox and return its full path.
    pub fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf, GradeError> {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}
