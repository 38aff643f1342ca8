//! Instrument status file reading.
//!
//! Each instrument publishes a single-line status record of the form
//! `<instrument_code> <current_run> <sequence_flag>`. Only the shape of
//! the record is validated; the sequence flag is carried through opaque.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Failed to read status file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unexpected status record format in '{0}'")]
    Malformed(PathBuf),
}

/// The current-run indicator published by an instrument.
///
/// Parsed fresh each cycle and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReading {
    pub instrument_code: String,
    pub current_run: u64,
    /// Third token of the record; present but not interpreted.
    pub sequence_flag: String,
}

/// Read and validate one status record from `path`.
///
/// Only the first line is considered. Exactly three whitespace-separated
/// tokens must be present and the run token must parse as a non-negative
/// integer (leading zeros tolerated), otherwise the reading is malformed.
pub fn read_status(path: &Path) -> Result<StatusReading, StatusError> {
    let contents = std::fs::read_to_string(path).map_err(|source| StatusError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let line = contents.lines().next().unwrap_or("");
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 3 {
        return Err(StatusError::Malformed(path.to_path_buf()));
    }

    let current_run: u64 = tokens[1]
        .parse()
        .map_err(|_| StatusError::Malformed(path.to_path_buf()))?;

    Ok(StatusReading {
        instrument_code: tokens[0].to_string(),
        current_run,
        sequence_flag: tokens[2].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn status_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_read_valid_status() {
        let file = status_file("WISH 00044733 0 \n");
        let reading = read_status(file.path()).unwrap();
        assert_eq!(reading.instrument_code, "WISH");
        assert_eq!(reading.current_run, 44733);
        assert_eq!(reading.sequence_flag, "0");
    }

    #[test]
    fn test_only_first_line_is_read() {
        let file = status_file("GEM 1234 0\ngarbage second line\n");
        let reading = read_status(file.path()).unwrap();
        assert_eq!(reading.instrument_code, "GEM");
        assert_eq!(reading.current_run, 1234);
    }

    #[test]
    fn test_two_tokens_is_malformed() {
        let file = status_file("WISH 44733\n");
        let err = read_status(file.path()).unwrap_err();
        assert!(matches!(err, StatusError::Malformed(_)));
    }

    #[test]
    fn test_four_tokens_is_malformed() {
        let file = status_file("WISH 44733 0 extra\n");
        let err = read_status(file.path()).unwrap_err();
        assert!(matches!(err, StatusError::Malformed(_)));
    }

    #[test]
    fn test_non_numeric_run_is_malformed() {
        let file = status_file("WISH forty 0\n");
        let err = read_status(file.path()).unwrap_err();
        assert!(matches!(err, StatusError::Malformed(_)));
    }

    #[test]
    fn test_malformed_error_names_the_path() {
        let file = status_file("INVALID LAST RUN FILE CONTENT\n");
        let err = read_status(file.path()).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_status(Path::new("/nonexistent/lastrun.txt")).unwrap_err();
        assert!(matches!(err, StatusError::Io { .. }));
    }
}
