//! Struct archiving functionality
//!
//! Records are written as timestamped CSV rows into the session's archive
//! directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::path::Path;
use std::fs::{File, OpenOptions};
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Could not open the archive file: {0}")]
    FileError(std::io::Error),

    #[error("Could not write the archive record: {0}")]
    CsvError(csv::Error),

    #[error("The archiver has not been initialised")]
    NotInitialised
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a timestamped csv.
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), ArchiveError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, ArchiveError> {
        Self::from_full_path(session.arch_root.join(path))
    }

    /// Create a new archiver writing to the given file, truncating it.
    pub fn from_full_path<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(ArchiveError::FileError)?;

        let w = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            writer: Some(w)
        })
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(
        &mut self, record: T
    ) -> Result<(), ArchiveError> {
        match self.writer {
            Some(ref mut w) => {
                w.serialize(record).map_err(ArchiveError::CsvError)?;
                w.flush().map_err(ArchiveError::FileError)
            },
            None => Err(ArchiveError::NotInitialised)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        time_s: f64,
        speed: f64
    }

    #[test]
    fn test_archiver() {
        let path = std::env::temp_dir().join("util_archive_test.csv");
        let mut arch = Archiver::from_full_path(&path).unwrap();
        arch.serialise(Row { time_s: 0.5, speed: 0.21 }).unwrap();
        arch.serialise(Row { time_s: 1.0, speed: 0.0 }).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["time_s,speed", "0.5,0.21", "1.0,0.0"]);

        let mut empty = Archiver::default();
        assert!(matches!(
            empty.serialise(Row { time_s: 0.0, speed: 0.0 }),
            Err(ArchiveError::NotInitialised)
        ));
    }
}
