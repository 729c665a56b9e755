//! Identifier allocation backed by a single counter file.
//!
//! The file holds the *next* id to hand out as plain decimal text.  Every
//! allocation reads it back from disk, so the file, not memory, is the
//! source of truth.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::file::{open_rw, replace_file};
use crate::error::{Error, Result};

/// First id handed out by a fresh counter.
pub const FIRST_ID: u64 = 1;

#[derive(Debug)]
pub struct Counter {
    path: PathBuf,
    file: File,
}

impl Counter {
    /// Open the counter file, initialising an empty or missing one to
    /// [`FIRST_ID`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = open_rw(&path)?;
        if file.metadata()?.len() == 0 {
            file.write_all(FIRST_ID.to_string().as_bytes())?;
            file.sync_all()?;
        }
        let mut counter = Self { path, file };
        counter.peek()?;
        Ok(counter)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The id the next [`allocate`](Self::allocate) will return.
    pub fn peek(&mut self) -> Result<u64> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut text = String::new();
        self.file.read_to_string(&mut text)?;
        text.trim()
            .parse()
            .map_err(|e| Error::malformed(&self.path, 1, format!("invalid counter {text:?}: {e}")))
    }

    /// Hand out the current id and persist its successor.
    pub fn allocate(&mut self) -> Result<u64> {
        let current = self.peek()?;
        let next = current
            .checked_add(1)
            .ok_or_else(|| Error::malformed(&self.path, 1, "counter overflow"))?;
        self.store(next)?;
        Ok(current)
    }

    /// Make sure the next id is at least `min`.
    pub fn raise_to(&mut self, min: u64) -> Result<bool> {
        if self.peek()? >= min {
            return Ok(false);
        }
        self.store(min)?;
        Ok(true)
    }

    fn store(&mut self, next: u64) -> Result<()> {
        self.file = replace_file(&self.path, next.to_string().as_bytes())?;
        Ok(())
    }

    pub fn close(self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
