//! File handlers
//!
//! `FileHandler` writes formatted lines to a single file, opened in append
//! or truncate mode, eagerly or on first emit. `WatchedFileHandler` adds a
//! staleness check so an external rotator (logrotate and friends) can move
//! the file out from under the process without losing output.

use crate::core::error::{LogError, Result};
use crate::core::handler::{Handler, HandlerCore};
use crate::core::record::LogRecord;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// How an existing file is treated on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    Append,
    Truncate,
}

pub(crate) fn open_log_file(path: &Path, mode: OpenMode) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                LogError::io_operation(
                    "creating log directory",
                    format!("cannot create '{}'", parent.display()),
                    e,
                )
            })?;
        }
    }

    let mut options = OpenOptions::new();
    options.create(true).write(true);
    match mode {
        OpenMode::Append => options.append(true),
        OpenMode::Truncate => options.truncate(true),
    };
    options
        .open(path)
        .map_err(|e| LogError::file(path.display().to_string(), format!("cannot open: {}", e)))
}

struct FileState {
    writer: Option<BufWriter<File>>,
}

/// Writes formatted records to one file.
///
/// # Examples
///
/// ```no_run
/// use logtree::handlers::{FileHandler, OpenMode};
/// use logtree::get_logger;
/// use std::sync::Arc;
///
/// let handler = FileHandler::new("/var/log/app.log", OpenMode::Append)?;
/// get_logger("app").add_handler(Arc::new(handler));
/// # Ok::<(), logtree::LogError>(())
/// ```
pub struct FileHandler {
    core: HandlerCore,
    path: PathBuf,
    mode: OpenMode,
    state: Mutex<FileState>,
}

impl FileHandler {
    /// Open the file immediately.
    pub fn new(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_log_file(&path, mode)?;
        Ok(Self {
            core: HandlerCore::new(format!("file:{}", path.display())),
            path,
            mode,
            state: Mutex::new(FileState {
                writer: Some(BufWriter::new(file)),
            }),
        })
    }

    /// Defer opening until the first emit. A handler configured for a path
    /// that is never logged to never touches the filesystem.
    pub fn delayed(path: impl AsRef<Path>, mode: OpenMode) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            core: HandlerCore::new(format!("file:{}", path.display())),
            path,
            mode,
            state: Mutex::new(FileState { writer: None }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&self, state: &mut FileState, line: &str) -> Result<()> {
        if state.writer.is_none() {
            let file = open_log_file(&self.path, self.mode)?;
            state.writer = Some(BufWriter::new(file));
        }
        // Checked just above.
        if let Some(writer) = state.writer.as_mut() {
            writer
                .write_all(line.as_bytes())
                .and_then(|()| writer.write_all(b"\n"))
                .map_err(|e| {
                    LogError::file(self.path.display().to_string(), format!("write failed: {}", e))
                })?;
        }
        Ok(())
    }
}

impl Handler for FileHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let line = self.core.format(record);
        let mut state = self.state.lock();
        self.write_record(&mut state, &line)
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(writer) = state.writer.as_mut() {
            writer.flush().map_err(|e| {
                LogError::file(self.path.display().to_string(), format!("flush failed: {}", e))
            })?;
        }
        Ok(())
    }

    fn close(&self) {
        if self.core.mark_closed() {
            let mut state = self.state.lock();
            if let Some(mut writer) = state.writer.take() {
                let _ = writer.flush();
            }
        }
    }
}

impl Drop for FileHandler {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(unix)]
fn file_identity(path: &Path) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path).ok().map(|m| (m.dev(), m.ino()))
}

/// File handler that survives external rotation.
///
/// Before each emit it compares the path's current device and inode against
/// the identity captured at open time; when they differ (or the path is
/// gone) the handle is stale and the file is reopened in append mode. On
/// non-unix targets there is no inode to compare, so it behaves like a plain
/// `FileHandler`.
pub struct WatchedFileHandler {
    core: HandlerCore,
    path: PathBuf,
    state: Mutex<WatchedState>,
}

struct WatchedState {
    writer: Option<BufWriter<File>>,
    #[cfg(unix)]
    identity: Option<(u64, u64)>,
}

impl WatchedFileHandler {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_log_file(&path, OpenMode::Append)?;
        #[cfg(unix)]
        let identity = file_identity(&path);
        Ok(Self {
            core: HandlerCore::new(format!("watched:{}", path.display())),
            path,
            state: Mutex::new(WatchedState {
                writer: Some(BufWriter::new(file)),
                #[cfg(unix)]
                identity,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reopen_if_moved(&self, state: &mut WatchedState) -> Result<()> {
        #[cfg(unix)]
        {
            let current = file_identity(&self.path);
            if current != state.identity || state.writer.is_none() {
                if let Some(mut writer) = state.writer.take() {
                    let _ = writer.flush();
                }
                let file = open_log_file(&self.path, OpenMode::Append)?;
                state.identity = file_identity(&self.path);
                state.writer = Some(BufWriter::new(file));
            }
        }
        #[cfg(not(unix))]
        if state.writer.is_none() {
            let file = open_log_file(&self.path, OpenMode::Append)?;
            state.writer = Some(BufWriter::new(file));
        }
        Ok(())
    }
}

impl Handler for WatchedFileHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let line = self.core.format(record);
        let mut state = self.state.lock();
        self.reopen_if_moved(&mut state)?;
        if let Some(writer) = state.writer.as_mut() {
            writer
                .write_all(line.as_bytes())
                .and_then(|()| writer.write_all(b"\n"))
                .and_then(|()| writer.flush())
                .map_err(|e| {
                    LogError::file(self.path.display().to_string(), format!("write failed: {}", e))
                })?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(writer) = state.writer.as_mut() {
            writer.flush().map_err(|e| {
                LogError::file(self.path.display().to_string(), format!("flush failed: {}", e))
            })?;
        }
        Ok(())
    }

    fn close(&self) {
        if self.core.mark_closed() {
            let mut state = self.state.lock();
            if let Some(mut writer) = state.writer.take() {
                let _ = writer.flush();
            }
        }
    }
}

impl Drop for WatchedFileHandler {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::level::Level;
    use tempfile::tempdir;

    fn record(message: &str) -> LogRecord {
        LogRecord::new("test", Level::Info, message)
    }

    #[test]
    fn test_append_mode_preserves_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "existing line\n").unwrap();

        let handler = FileHandler::new(&path, OpenMode::Append).unwrap();
        handler.handle(&record("appended"));
        handler.close();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("existing line\n"));
        assert!(content.contains("appended"));
    }

    #[test]
    fn test_truncate_mode_discards_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "existing line\n").unwrap();

        let handler = FileHandler::new(&path, OpenMode::Truncate).unwrap();
        handler.handle(&record("fresh"));
        handler.close();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("existing line"));
        assert!(content.contains("fresh"));
    }

    #[test]
    fn test_delayed_open_touches_nothing_until_emit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lazy.log");

        let handler = FileHandler::delayed(&path, OpenMode::Append);
        assert!(!path.exists());

        handler.handle(&record("first"));
        handler.flush().unwrap();
        assert!(path.exists());
        assert!(fs::read_to_string(&path).unwrap().contains("first"));
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/app.log");

        let handler = FileHandler::new(&path, OpenMode::Append).unwrap();
        handler.handle(&record("nested"));
        handler.close();
        assert!(path.exists());
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let handler = FileHandler::new(&path, OpenMode::Append).unwrap();

        handler.handle(&record("one"));
        handler.close();
        handler.close();
        // Emits after close are gated out, not errors.
        handler.handle(&record("after close"));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("one"));
        assert!(!content.contains("after close"));
    }

    #[cfg(unix)]
    #[test]
    fn test_watched_handler_reopens_after_external_move() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("watched.log");
        let handler = WatchedFileHandler::new(&path).unwrap();

        handler.handle(&record("before move"));
        handler.flush().unwrap();

        // External rotator renames the file away.
        let moved = dir.path().join("watched.log.1");
        fs::rename(&path, &moved).unwrap();

        handler.handle(&record("after move"));
        handler.flush().unwrap();

        assert!(fs::read_to_string(&moved).unwrap().contains("before move"));
        assert!(fs::read_to_string(&path).unwrap().contains("after move"));
    }
}
