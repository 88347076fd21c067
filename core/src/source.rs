//! The central **abstraction** for data collection.
//!
//! Each data kind (interface counters, devices, port mappings, latency) is a
//! [`SnapshotSource`]. The registry only ever talks to this trait.
//!
//! **Failure contract:** `collect` never fails. A source that cannot reach its
//! data logs the condition and returns whatever it could gather, possibly
//! nothing, so one broken source never hides the metrics of another.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use wrtmon_common::metric::{MetricDescriptor, MetricSample};

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Static metadata of every family this source can emit.
    ///
    /// Pure and idempotent: the same descriptors on every call.
    fn describe(&self) -> Vec<Arc<MetricDescriptor>>;

    /// Gathers the current samples. Best effort, never fails.
    async fn collect(&self) -> Vec<MetricSample>;
}

/// Opens the first candidate that exists and reads it line by line.
///
/// Returns the path that was used, or the last open error when none worked.
pub fn read_first_existing(candidates: &[PathBuf]) -> io::Result<(PathBuf, Vec<String>)> {
    let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no candidate path configured");

    for path in candidates {
        match File::open(path) {
            Ok(file) => return Ok((path.clone(), read_lines(file)?)),
            Err(e) => last_err = e,
        }
    }

    Err(last_err)
}

pub fn read_lines_from(path: &Path) -> io::Result<Vec<String>> {
    read_lines(File::open(path)?)
}

/// Splits on `\n`, dropping a trailing `\r`. Invalid UTF-8 is replaced
/// per line so one bad byte does not lose the rest of the file.
fn read_lines(mut file: File) -> io::Result<Vec<String>> {
    let mut raw: Vec<u8> = Vec::new();
    file.read_to_end(&mut raw)?;

    let mut lines: Vec<String> = raw
        .split(|b| *b == b'\n')
        .map(|line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            String::from_utf8_lossy(line).into_owned()
        })
        .collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    Ok(lines)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use temp_dir::TempDir;

    #[test]
    fn first_existing_candidate_wins() {
        let dir = TempDir::new().unwrap();
        let second = dir.child("second");
        let third = dir.child("third");
        std::fs::write(&second, "from second\n").unwrap();
        std::fs::write(&third, "from third\n").unwrap();

        let candidates = vec![dir.child("missing"), second.clone(), third];
        let (used, lines) = read_first_existing(&candidates).unwrap();

        assert_eq!(used, second);
        assert_eq!(lines, vec!["from second".to_string()]);
    }

    #[test]
    fn no_existing_candidate_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = read_first_existing(&[dir.child("a"), dir.child("b")]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(read_first_existing(&[]).is_err());
    }

    #[test]
    fn invalid_utf8_only_affects_its_own_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.child("leases");
        std::fs::write(&path, b"first\r\ncaf\xe9\nlast").unwrap();

        let lines = read_lines_from(&path).unwrap();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "first");
        assert!(lines[1].starts_with("caf"));
        assert_eq!(lines[2], "last");
    }

    #[test]
    fn empty_file_has_no_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.child("empty");
        std::fs::write(&path, b"").unwrap();
        assert!(read_lines_from(&path).unwrap().is_empty());
    }
}
