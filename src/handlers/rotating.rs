//! Rotating file handler
//!
//! One file-backed handler with an injected rotation policy: rotate when the
//! next write would push the file past a size threshold, or when the clock
//! crosses an hourly/daily/midnight/weekly boundary. Timed rotation reads an
//! injected [`Clock`] so boundary behavior is testable without sleeping.

use crate::core::clock::{Clock, SystemClock};
use crate::core::error::{LogError, Result};
use crate::core::handler::{Handler, HandlerCore};
use crate::core::record::LogRecord;
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::file::{open_log_file, OpenMode};

/// Boundary for timed rotation. All boundaries are computed in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationWhen {
    /// Top of the next hour.
    Hourly,
    /// 24 hours after the previous rollover.
    Daily,
    /// Next 00:00 UTC.
    Midnight,
    /// Next occurrence of the given weekday, at 00:00 UTC.
    Weekly(Weekday),
}

/// When to rotate and how many backups to retain. `backup_count` of zero
/// means unlimited retention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationPolicy {
    Size { max_bytes: u64, backup_count: usize },
    Timed { when: RotationWhen, backup_count: usize },
}

impl RotationPolicy {
    fn backup_count(&self) -> usize {
        match *self {
            RotationPolicy::Size { backup_count, .. } => backup_count,
            RotationPolicy::Timed { backup_count, .. } => backup_count,
        }
    }
}

const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

struct RotateState {
    writer: Option<BufWriter<File>>,
    current_size: u64,
    next_rollover: Option<DateTime<Utc>>,
    /// Set permanently after a failed rotation; the handler becomes a no-op
    /// sink instead of retrying on every emit.
    disabled: bool,
}

/// File handler that rotates by size or by time.
///
/// Size rotation shifts the numbered chain `base.1 -> base.2 -> ...` and
/// renames the live file to `base.1`. Timed rotation renames the live file
/// to `base.<timestamp>` and prunes the oldest timestamped backups past the
/// retention limit. Rotated backups are optionally gzip-compressed.
///
/// # Examples
///
/// ```no_run
/// use logtree::handlers::{RotatingFileHandler, RotationPolicy};
/// use logtree::get_logger;
/// use std::sync::Arc;
///
/// let handler = RotatingFileHandler::new(
///     "/var/log/app.log",
///     RotationPolicy::Size { max_bytes: 10 * 1024 * 1024, backup_count: 5 },
/// )?;
/// get_logger("app").add_handler(Arc::new(handler));
/// # Ok::<(), logtree::LogError>(())
/// ```
pub struct RotatingFileHandler {
    core: HandlerCore,
    path: PathBuf,
    policy: RotationPolicy,
    compress: bool,
    clock: Arc<dyn Clock>,
    state: Mutex<RotateState>,
}

impl RotatingFileHandler {
    pub fn new(path: impl AsRef<Path>, policy: RotationPolicy) -> Result<Self> {
        Self::with_clock(path, policy, Arc::new(SystemClock))
    }

    /// Build with an explicit clock. Tests pass a manual clock to exercise
    /// rollover boundaries deterministically.
    pub fn with_clock(
        path: impl AsRef<Path>,
        policy: RotationPolicy,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_log_file(&path, OpenMode::Append)?;
        let current_size = file
            .metadata()
            .map_err(|e| {
                LogError::file(path.display().to_string(), format!("cannot stat: {}", e))
            })?
            .len();

        let next_rollover = match policy {
            RotationPolicy::Timed { when, .. } => Some(next_rollover(when, clock.now())),
            RotationPolicy::Size { .. } => None,
        };

        Ok(Self {
            core: HandlerCore::new(format!("rotating:{}", path.display())),
            path,
            policy,
            compress: false,
            clock,
            state: Mutex::new(RotateState {
                writer: Some(BufWriter::new(file)),
                current_size,
                next_rollover,
                disabled: false,
            }),
        })
    }

    /// Gzip each backup right after it is rotated out.
    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    fn should_rotate(&self, state: &RotateState, incoming_bytes: u64) -> bool {
        match self.policy {
            RotationPolicy::Size { max_bytes, .. } => {
                state.current_size > 0 && state.current_size + incoming_bytes > max_bytes
            }
            RotationPolicy::Timed { .. } => match state.next_rollover {
                Some(at) => self.clock.now() >= at,
                None => false,
            },
        }
    }

    /// Close, rename, prune, and reopen. The caller holds the state lock, so
    /// the whole sequence is atomic with respect to other emitters.
    fn rotate(&self, state: &mut RotateState) -> Result<()> {
        if let Some(mut writer) = state.writer.take() {
            writer.flush().map_err(|e| {
                LogError::rotation(
                    self.path.display().to_string(),
                    format!("flush before rotation failed: {}", e),
                )
            })?;
        }

        match self.policy {
            RotationPolicy::Size { backup_count, .. } => self.rotate_numbered(backup_count)?,
            RotationPolicy::Timed { backup_count, .. } => self.rotate_timestamped(backup_count)?,
        }

        let file = open_log_file(&self.path, OpenMode::Append).map_err(|e| {
            LogError::rotation(
                self.path.display().to_string(),
                format!("cannot reopen after rotation: {}", e),
            )
        })?;
        state.writer = Some(BufWriter::new(file));
        state.current_size = 0;
        if let RotationPolicy::Timed { when, .. } = self.policy {
            // Recomputed from the current time, so a clock jump across
            // several boundaries still causes exactly one rotation.
            state.next_rollover = Some(next_rollover(when, self.clock.now()));
        }
        Ok(())
    }

    fn rotate_numbered(&self, backup_count: usize) -> Result<()> {
        let highest = if backup_count > 0 {
            // The slot at the retention limit is about to be shifted into;
            // whatever occupies it ages out.
            let _ = fs::remove_file(self.numbered_path(backup_count, false));
            let _ = fs::remove_file(self.numbered_path(backup_count, true));
            backup_count - 1
        } else {
            self.highest_backup_index()
        };

        for index in (1..=highest).rev() {
            for compressed in [true, false] {
                let from = self.numbered_path(index, compressed);
                if from.exists() {
                    self.rename_backup(&from, &self.numbered_path(index + 1, compressed))?;
                }
            }
        }

        if self.path.exists() {
            let first = self.numbered_path(1, false);
            self.rename_backup(&self.path, &first)?;
            if self.compress {
                compress_backup(&first)?;
            }
        }
        Ok(())
    }

    fn rotate_timestamped(&self, backup_count: usize) -> Result<()> {
        if self.path.exists() {
            let suffix = self.clock.now().format(BACKUP_TIMESTAMP_FORMAT);
            let backup = suffixed_path(&self.path, &suffix.to_string());
            self.rename_backup(&self.path, &backup)?;
            if self.compress {
                compress_backup(&backup)?;
            }
        }
        if backup_count > 0 {
            self.prune_timestamped(backup_count)?;
        }
        Ok(())
    }

    /// Delete the oldest timestamped backups beyond the retention limit.
    /// The timestamp format sorts lexicographically in chronological order.
    fn prune_timestamped(&self, backup_count: usize) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let stem = match self.path.file_name().and_then(|n| n.to_str()) {
            Some(name) => format!("{}.", name),
            None => return Ok(()),
        };

        let mut backups: Vec<String> = fs::read_dir(&dir)
            .map_err(|e| {
                LogError::rotation(
                    self.path.display().to_string(),
                    format!("cannot list backups: {}", e),
                )
            })?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().map(String::from))
            .filter(|name| {
                name.strip_prefix(&stem)
                    .is_some_and(is_timestamp_suffix)
            })
            .collect();

        if backups.len() <= backup_count {
            return Ok(());
        }
        backups.sort();
        for name in &backups[..backups.len() - backup_count] {
            let _ = fs::remove_file(dir.join(name));
        }
        Ok(())
    }

    fn highest_backup_index(&self) -> usize {
        let mut index = 0;
        while self.numbered_path(index + 1, false).exists()
            || self.numbered_path(index + 1, true).exists()
        {
            index += 1;
        }
        index
    }

    fn numbered_path(&self, index: usize, compressed: bool) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.log")
            .to_string();
        name.push_str(&format!(".{}", index));
        if compressed {
            name.push_str(".gz");
        }
        self.path.with_file_name(name)
    }

    fn rename_backup(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).map_err(|e| {
            LogError::rotation(
                self.path.display().to_string(),
                format!("cannot rename '{}' to '{}': {}", from.display(), to.display(), e),
            )
        })
    }
}

impl Handler for RotatingFileHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let line = self.core.format(record);
        let mut state = self.state.lock();
        if state.disabled {
            return Err(LogError::HandlerDisabled(self.core.name().to_string()));
        }

        // The terminator counts toward the size threshold.
        let incoming = line.len() as u64 + 1;
        if self.should_rotate(&state, incoming) {
            if let Err(e) = self.rotate(&mut state) {
                state.disabled = true;
                return Err(e);
            }
        }

        if state.writer.is_none() {
            let file = open_log_file(&self.path, OpenMode::Append)?;
            state.writer = Some(BufWriter::new(file));
        }
        if let Some(writer) = state.writer.as_mut() {
            writer
                .write_all(line.as_bytes())
                .and_then(|()| writer.write_all(b"\n"))
                .map_err(|e| {
                    LogError::file(self.path.display().to_string(), format!("write failed: {}", e))
                })?;
            state.current_size += incoming;
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

impl Drop for RotatingFileHandler {
    fn drop(&mut self) {
        self.close();
    }
}

/// Compute the rollover instant following `from`.
fn next_rollover(when: RotationWhen, from: DateTime<Utc>) -> DateTime<Utc> {
    match when {
        RotationWhen::Hourly => {
            let top = Utc
                .with_ymd_and_hms(from.year(), from.month(), from.day(), from.hour(), 0, 0)
                .single()
                .unwrap_or(from);
            top + Duration::hours(1)
        }
        RotationWhen::Daily => from + Duration::days(1),
        RotationWhen::Midnight => {
            let midnight = Utc
                .with_ymd_and_hms(from.year(), from.month(), from.day(), 0, 0, 0)
                .single()
                .unwrap_or(from);
            midnight + Duration::days(1)
        }
        RotationWhen::Weekly(weekday) => {
            let midnight = Utc
                .with_ymd_and_hms(from.year(), from.month(), from.day(), 0, 0, 0)
                .single()
                .unwrap_or(from);
            let ahead = (7 + weekday.num_days_from_monday() as i64
                - from.weekday().num_days_from_monday() as i64
                - 1)
                % 7
                + 1;
            midnight + Duration::days(ahead)
        }
    }
}

/// `true` for `YYYY-MM-DD_HH-MM-SS` with an optional `.gz`.
fn is_timestamp_suffix(suffix: &str) -> bool {
    let bare = suffix.strip_suffix(".gz").unwrap_or(suffix);
    bare.len() == 19
        && bare.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            10 => b == b'_',
            13 | 16 => b == b'-',
            _ => b.is_ascii_digit(),
        })
}

fn suffixed_path(base: &Path, suffix: &str) -> PathBuf {
    let name = base
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("app.log");
    base.with_file_name(format!("{}.{}", name, suffix))
}

/// Gzip a rotated backup in place: stream into `<path>.gz.tmp`, rename to
/// `<path>.gz`, then remove the original. The original is only deleted once
/// the compressed copy is complete.
fn compress_backup(path: &Path) -> Result<()> {
    let gz_path = suffixed_with_gz(path);
    let tmp_path = path.with_extension("gz.tmp");

    let input = File::open(path).map_err(|e| {
        LogError::io_operation(
            "compressing backup",
            format!("cannot open '{}'", path.display()),
            e,
        )
    })?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&tmp_path).map_err(|e| {
        LogError::io_operation(
            "compressing backup",
            format!("cannot create '{}'", tmp_path.display()),
            e,
        )
    })?;
    let mut encoder =
        flate2::write::GzEncoder::new(BufWriter::new(output), flate2::Compression::default());

    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buffer).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            LogError::io_operation("compressing backup", "read failed", e)
        })?;
        if n == 0 {
            break;
        }
        encoder.write_all(&buffer[..n]).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            LogError::io_operation("compressing backup", "write failed", e)
        })?;
    }
    encoder.finish().map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        LogError::io_operation("compressing backup", "finish failed", e)
    })?;

    fs::rename(&tmp_path, &gz_path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        LogError::io_operation(
            "compressing backup",
            format!("cannot rename to '{}'", gz_path.display()),
            e,
        )
    })?;
    let _ = fs::remove_file(path);
    Ok(())
}

fn suffixed_with_gz(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("backup");
    path.with_file_name(format!("{}.gz", name))
}
