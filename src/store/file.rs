//! Persistence writer: append and snapshot writes of CSV record files.
//!
//! Appends go to the end of the open handle.  Snapshots never truncate the
//! live file: the new contents are written to a sibling `*.tmp` file,
//! synced, and renamed over the target, after which the handle is reopened.
//! A crash mid-snapshot leaves either the old or the new file on disk.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::error::{Error, Result};

pub(crate) fn open_rw(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("store"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `contents` via write-new-then-rename and return a
/// fresh read/write handle to the new file.
pub(crate) fn replace_file(path: &Path, contents: &[u8]) -> io::Result<File> {
    let tmp = tmp_path(path);
    {
        let mut f = File::create(&tmp)?;
        f.write_all(contents)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        // Directory handles cannot be opened on every platform.
        if let Ok(d) = File::open(dir) {
            let _ = d.sync_all();
        }
    }
    open_rw(path)
}

fn to_bytes(records: &[StringRecord]) -> Result<Vec<u8>> {
    let mut w = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for r in records {
        w.write_record(r)?;
    }
    w.into_inner().map_err(|e| Error::Io(e.into_error()))
}

/// An open CSV file holding one record per line.
#[derive(Debug)]
pub struct RecordFile {
    path: PathBuf,
    file: File,
}

impl RecordFile {
    /// Open `path` for reading and writing, creating it if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = open_rw(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record from the start of the file.
    ///
    /// Row length is not checked here; the codec reports it with the line.
    pub fn read_records(&mut self) -> Result<Vec<StringRecord>> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(&mut self.file);
        let mut records = Vec::new();
        for rec in reader.records() {
            records.push(rec?);
        }
        Ok(records)
    }

    /// Append records at the end of the file.
    pub fn append(&mut self, records: &[StringRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let bytes = to_bytes(records)?;
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&bytes)?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Replace the whole file with `records`.
    pub fn snapshot(&mut self, records: &[StringRecord]) -> Result<()> {
        let bytes = to_bytes(records)?;
        self.file = replace_file(&self.path, &bytes)?;
        Ok(())
    }

    /// Flush to disk and release the handle.
    pub fn close(self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn append_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = RecordFile::open(dir.path().join("items.csv")).unwrap();
        assert!(f.read_records().unwrap().is_empty());

        f.append(&[rec(&["1", "a"]), rec(&["2", "b, with comma"])]).unwrap();
        f.append(&[rec(&["3", "line\nbreak"])]).unwrap();

        let got = f.read_records().unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(&got[1][1], "b, with comma");
        assert_eq!(&got[2][1], "line\nbreak");
    }

    #[test]
    fn snapshot_replaces_contents_and_appends_continue() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.csv");
        let mut f = RecordFile::open(&path).unwrap();
        f.append(&[rec(&["1"]), rec(&["2"]), rec(&["3"])]).unwrap();

        f.snapshot(&[rec(&["9"])]).unwrap();
        f.append(&[rec(&["10"])]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "9\n10\n");
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn snapshot_of_nothing_empties_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.csv");
        let mut f = RecordFile::open(&path).unwrap();
        f.append(&[rec(&["1"])]).unwrap();
        f.snapshot(&[]).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
        f.close().unwrap();
    }

    #[test]
    fn rows_of_different_length_are_returned_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.csv");
        fs::write(&path, "1,2,3\n4\n").unwrap();
        let mut f = RecordFile::open(&path).unwrap();
        let got = f.read_records().unwrap();
        assert_eq!(got[0].len(), 3);
        assert_eq!(got[1].len(), 1);
    }
}
