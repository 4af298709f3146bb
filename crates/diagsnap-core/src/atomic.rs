//! Crash-safe file persistence.
//!
//! Every file diagsnap produces goes through [`write`] or [`append`]. Content
//! is written to a hidden sibling `.{basename}.{hex}.tmp` in the target's own
//! directory, synced, then renamed over the target. The rename stays on one
//! filesystem, so an observer sees either the old file or the complete new
//! one.
//!
//! Two writers racing on the same path both succeed; the last rename wins.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use tracing::debug;

use crate::error::{PersistError, PersistResult};

/// A fully written temp file that has not yet replaced its target.
///
/// Dropping it without calling [`StagedWrite::commit`] removes the temp file.
#[derive(Debug)]
pub struct StagedWrite {
    target: PathBuf,
    temp: NamedTempFile,
}

impl StagedWrite {
    /// Path of the temp file holding the staged content.
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Path the content will land at on commit.
    pub fn target_path(&self) -> &Path {
        &self.target
    }

    /// Rename the temp file over the target.
    pub fn commit(self) -> PersistResult<()> {
        let temp = self.temp.path().to_path_buf();
        // On failure the temp file comes back inside the error and is removed when dropped.
        self.temp
            .persist(&self.target)
            .map_err(|e| PersistError::Rename {
                target: self.target.clone(),
                temp,
                source: e.error,
            })?;
        debug!(path = %self.target.display(), "atomic write committed");
        Ok(())
    }
}

fn split_target(target: &Path) -> PersistResult<(PathBuf, String)> {
    let file_name = target
        .file_name()
        .ok_or_else(|| PersistError::InvalidTarget(target.to_path_buf()))?;
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, file_name.to_string_lossy().into_owned()))
}

fn temp_prefix(file_name: &str) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!(".{}.{}", file_name, &hex[..16])
}

/// Write `content` to a temp sibling of `path` without touching `path`.
pub fn stage(path: &Path, content: &[u8]) -> PersistResult<StagedWrite> {
    stage_from(path, content)
}

/// Stream `reader` into a temp sibling of `path` without touching `path`.
///
/// A read or write error discards the temp file and leaves `path` as it was.
pub fn stage_from(path: &Path, mut reader: impl Read) -> PersistResult<StagedWrite> {
    let (dir, file_name) = split_target(path)?;
    let prefix = temp_prefix(&file_name);

    let mut temp = Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .rand_bytes(0)
        .tempfile_in(&dir)
        .map_err(|source| PersistError::Write {
            target: path.to_path_buf(),
            temp: dir.join(format!("{prefix}.tmp")),
            source,
        })?;

    let written = io::copy(&mut reader, &mut temp).and_then(|_| temp.as_file().sync_all());
    if let Err(source) = written {
        return Err(PersistError::Write {
            target: path.to_path_buf(),
            temp: temp.path().to_path_buf(),
            source,
        });
    }

    Ok(StagedWrite {
        target: path.to_path_buf(),
        temp,
    })
}

/// Atomically replace `path` with `content`.
pub fn write(path: &Path, content: impl AsRef<[u8]>) -> PersistResult<()> {
    stage(path, content.as_ref())?.commit()
}

/// Atomically append `content` to `path`, creating it if missing.
///
/// Implemented as read, concatenate, [`write`]. Not safe for concurrent
/// appenders to the same path.
pub fn append(path: &Path, content: impl AsRef<[u8]>) -> PersistResult<()> {
    let mut buf = match fs::read(path) {
        Ok(existing) => existing,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(source) => {
            return Err(PersistError::Read {
                target: path.to_path_buf(),
                source,
            })
        }
    };
    buf.extend_from_slice(content.as_ref());
    write(path, buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leftover_temps(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("tmp"))
            .collect()
    }

    #[test]
    fn write_creates_file_with_exact_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uptime.log");
        write(&path, "up 3 days").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "up 3 days");
        assert!(leftover_temps(dir.path()).is_empty());
    }

    #[test]
    fn write_replaces_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.log");
        write(&path, "old content that is longer").unwrap();
        write(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn temp_file_is_hidden_sibling_of_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk_free.log");
        let staged = stage(&path, b"x").unwrap();

        let temp = staged.temp_path().to_path_buf();
        assert_eq!(temp.parent(), path.parent());
        let name = temp.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".disk_free.log."), "got {name}");
        assert!(name.ends_with(".tmp"), "got {name}");
        let hex_part = &name[".disk_free.log.".len()..name.len() - ".tmp".len()];
        assert_eq!(hex_part.len(), 16);
        assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit()));
        drop(staged);
    }

    #[test]
    fn dropped_stage_removes_temp_and_leaves_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network_summary.log");
        write(&path, "previous").unwrap();

        let staged = stage(&path, b"replacement").unwrap();
        assert!(staged.temp_path().exists());
        drop(staged);

        assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
        assert!(leftover_temps(dir.path()).is_empty());
    }

    #[test]
    fn append_creates_then_extends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        append(&path, "a").unwrap();
        append(&path, "b").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ab");
    }

    #[test]
    fn write_into_missing_directory_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("os_version.log");
        match write(&path, "x") {
            Err(PersistError::Write { target, .. }) => assert_eq!(target, path),
            other => panic!("expected Write error, got {other:?}"),
        }
        assert!(!path.exists());
    }

    #[test]
    fn rename_onto_directory_is_rename_error_and_cleans_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        match write(&target, "content") {
            Err(PersistError::Rename { .. }) => {}
            other => panic!("expected Rename error, got {other:?}"),
        }
        assert!(target.is_dir());
        assert!(leftover_temps(dir.path()).is_empty());
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        assert!(matches!(
            write(Path::new("/"), "x"),
            Err(PersistError::InvalidTarget(_))
        ));
    }

    struct BrokenReader {
        sent: bool,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::other("device went away"));
            }
            self.sent = true;
            let n = buf.len().min(7);
            buf[..n].copy_from_slice(&b"partial"[..n]);
            Ok(n)
        }
    }

    #[test]
    fn failed_stage_leaves_existing_target_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("process_summary.log");
        write(&path, "complete previous capture").unwrap();

        match stage_from(&path, BrokenReader { sent: false }) {
            Err(PersistError::Write { target, .. }) => assert_eq!(target, path),
            other => panic!("expected Write error, got {other:?}"),
        }
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "complete previous capture"
        );
        assert!(leftover_temps(dir.path()).is_empty());
    }

    #[test]
    fn append_surfaces_unreadable_target_as_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("audit.jsonl");
        fs::create_dir(&target).unwrap();

        match append(&target, "line\n") {
            Err(PersistError::Read { target: t, .. }) => assert_eq!(t, target),
            other => panic!("expected Read error, got {other:?}"),
        }
        assert!(target.is_dir());
        assert!(leftover_temps(dir.path()).is_empty());
    }

    #[test]
    fn stage_from_streams_reader_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.log");
        stage_from(&path, io::Cursor::new("Mem: 16G"))
            .unwrap()
            .commit()
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Mem: 16G");
    }
}
