//! File output and rotation, end to end through a logger.

use logtree::handlers::{
    FileHandler, OpenMode, RotatingFileHandler, RotationPolicy, RotationWhen,
};
use logtree::{get_logger, Formatter, Handler, Level, ManualClock, TemplateStyle};
use chrono::{Duration, TimeZone, Utc};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).unwrap().lines().count()
}

#[test]
fn test_logger_writes_formatted_lines_to_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");

    let handler = Arc::new(FileHandler::new(&path, OpenMode::Append).unwrap());
    handler.set_formatter(
        Formatter::new("%(levelname)s %(name)s %(message)s", TemplateStyle::Percent).unwrap(),
    );

    let logger = get_logger("it_file.writer");
    logger.set_level(Some(Level::Debug));
    logger.set_propagate(false);
    logger.add_handler(handler.clone());

    logger.info("first");
    logger.error("second");
    handler.close();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("INFO it_file.writer first"));
    assert!(content.contains("ERROR it_file.writer second"));
    assert_eq!(line_count(&path), 2);
}

#[test]
fn test_size_rotation_keeps_every_line_within_retention() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sized.log");

    let handler = Arc::new(
        RotatingFileHandler::new(
            &path,
            RotationPolicy::Size {
                max_bytes: 200,
                backup_count: 25,
            },
        )
        .unwrap(),
    );

    let logger = get_logger("it_rot.size");
    logger.set_level(Some(Level::Debug));
    logger.set_propagate(false);
    logger.add_handler(handler.clone());

    for i in 0..30 {
        logger.info(format!("sized entry {:02}", i));
    }
    handler.close();

    // Every line must land somewhere: live file plus numbered backups.
    let mut total = line_count(&path);
    let mut index = 1;
    loop {
        let backup = path.with_file_name(format!("sized.log.{}", index));
        if !backup.exists() {
            break;
        }
        total += line_count(&backup);
        index += 1;
    }
    assert_eq!(total, 30);
    assert!(index > 1, "expected at least one rotation");
}

#[test]
fn test_retention_cap_deletes_oldest_numbered_backup() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("capped.log");

    let handler = RotatingFileHandler::new(
        &path,
        RotationPolicy::Size {
            max_bytes: 100,
            backup_count: 2,
        },
    )
    .unwrap();

    for i in 0..40 {
        handler.handle(&logtree::LogRecord::new(
            "it_rot.cap",
            Level::Info,
            format!("entry {}", i),
        ));
    }
    handler.close();

    assert!(path.with_file_name("capped.log.1").exists());
    assert!(path.with_file_name("capped.log.2").exists());
    assert!(!path.with_file_name("capped.log.3").exists());
}

#[test]
fn test_hourly_boundary_rotates_exactly_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hourly.log");
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 45, 0).unwrap(),
    ));

    let handler = RotatingFileHandler::with_clock(
        &path,
        RotationPolicy::Timed {
            when: RotationWhen::Hourly,
            backup_count: 0,
        },
        clock.clone(),
    )
    .unwrap();

    let record = |msg: &str| logtree::LogRecord::new("it_rot.hourly", Level::Info, msg);

    handler.handle(&record("at 09:45"));
    clock.advance(Duration::minutes(10));
    handler.handle(&record("at 09:55"));
    clock.advance(Duration::minutes(10));
    handler.handle(&record("at 10:05, past the boundary"));
    clock.advance(Duration::minutes(10));
    handler.handle(&record("at 10:15, same hour"));
    handler.close();

    let backups: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|n| n.starts_with("hourly.log."))
        })
        .collect();
    assert_eq!(backups.len(), 1);

    let backup_content = fs::read_to_string(backups[0].path()).unwrap();
    assert!(backup_content.contains("at 09:45"));
    assert!(backup_content.contains("at 09:55"));

    let live = fs::read_to_string(&path).unwrap();
    assert!(live.contains("past the boundary"));
    assert!(live.contains("same hour"));
}

#[test]
fn test_backwards_clock_does_not_rotate() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("back.log");
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 45, 0).unwrap(),
    ));

    let handler = RotatingFileHandler::with_clock(
        &path,
        RotationPolicy::Timed {
            when: RotationWhen::Midnight,
            backup_count: 0,
        },
        clock.clone(),
    )
    .unwrap();

    let record = |msg: &str| logtree::LogRecord::new("it_rot.back", Level::Info, msg);
    handler.handle(&record("before"));
    clock.set(Utc.with_ymd_and_hms(2025, 3, 1, 2, 0, 0).unwrap());
    handler.handle(&record("after the clock went backwards"));
    handler.close();

    assert_eq!(line_count(&path), 2);
    assert!(!dir
        .path()
        .read_dir()
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| e.file_name().to_str().is_some_and(|n| n.contains("back.log."))));
}

#[cfg(unix)]
#[test]
fn test_watched_file_follows_external_rotation() {
    use logtree::handlers::WatchedFileHandler;

    let dir = tempdir().unwrap();
    let path = dir.path().join("svc.log");
    let handler = Arc::new(WatchedFileHandler::new(&path).unwrap());

    let logger = get_logger("it_rot.watched");
    logger.set_level(Some(Level::Debug));
    logger.set_propagate(false);
    logger.add_handler(handler.clone());

    logger.info("pre-rotation");
    fs::rename(&path, dir.path().join("svc.log.old")).unwrap();
    logger.info("post-rotation");
    handler.close();

    assert!(fs::read_to_string(dir.path().join("svc.log.old"))
        .unwrap()
        .contains("pre-rotation"));
    assert!(fs::read_to_string(&path).unwrap().contains("post-rotation"));
}

#[test]
fn test_delayed_handler_creates_file_on_first_record_only() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lazy.log");

    let handler = Arc::new(FileHandler::delayed(&path, OpenMode::Append));
    let logger = get_logger("it_rot.lazy");
    logger.set_level(Some(Level::Warning));
    logger.set_propagate(false);
    logger.add_handler(handler.clone());

    // Gated out below the level: still no file.
    logger.info("suppressed");
    assert!(!path.exists());

    logger.warning("materializes the file");
    handler.close();
    assert!(fs::read_to_string(&path).unwrap().contains("materializes"));
}
