//! Staging loader: corpus documents to table rows

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, warn};

use super::config::StagingConfig;
use super::error::StagingError;
use super::ingest::{discover_files, read_document};
use super::prepare::RecordPreparer;
use super::progress::LoadProgress;
use super::sink::{MAX_SQL_LOG_BYTES, RecordSink, render_insert_sql, same_keys, truncate_for_log};
use crate::inference::{Record, SizingConfig};

/// Documents already loaded, by path relative to the corpus root
#[derive(Debug)]
pub struct ControlLog {
    path: PathBuf,
    entries: HashSet<String>,
}

impl ControlLog {
    /// Read the log at `path`; a missing file is an empty log
    pub fn load(path: &Path) -> Result<Self, StagingError> {
        let entries = match fs::read_to_string(path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                return Err(StagingError::ControlLog {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, relative: &str) -> bool {
        self.entries.contains(relative)
    }

    /// Append entries to the file and remember them
    pub fn append<'a>(
        &mut self,
        relatives: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), StagingError> {
        let to_control_err = |e: std::io::Error| StagingError::ControlLog {
            path: self.path.clone(),
            error: e.to_string(),
        };

        let new: Vec<&str> = relatives
            .into_iter()
            .filter(|r| !self.entries.contains(*r))
            .collect();
        if new.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(to_control_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(to_control_err)?;
        for relative in &new {
            writeln!(file, "{relative}").map_err(to_control_err)?;
        }

        self.entries.extend(new.into_iter().map(str::to_string));
        Ok(())
    }
}

/// Path of `file` relative to `root`, `/`-separated
pub fn relative_path(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Counters for one staging run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    /// Documents found under the root
    pub files_found: usize,
    /// Documents skipped because the control log lists them
    pub files_skipped: usize,
    /// Documents fully processed in this run
    pub files_loaded: usize,
    /// Documents that could not be read or parsed
    pub files_failed: usize,
    /// Records read from processed documents
    pub records_read: usize,
    /// Records dropped by validation
    pub records_dropped: usize,
    /// Rows handed to the sink
    pub rows_written: usize,
    /// Batches handed to the sink
    pub batches: usize,
    /// Wall-clock time of the run
    #[serde(skip)]
    pub duration: Duration,
}

impl LoadStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows per second
    pub fn throughput(&self) -> Option<f64> {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            return None;
        }
        Some(self.rows_written as f64 / secs)
    }
}

/// Accumulates rows with a common key set and flushes them to the sink
struct BatchWriter<'a, S: RecordSink + ?Sized> {
    sink: &'a mut S,
    table: &'a str,
    conflict_keys: Vec<&'a str>,
    batch_size: usize,
    rows: Vec<Record>,
    /// Documents whose rows are all either flushed or in `rows`
    finished_files: Vec<String>,
}

impl<S: RecordSink + ?Sized> BatchWriter<'_, S> {
    fn push(
        &mut self,
        row: Record,
        log: &mut ControlLog,
        stats: &mut LoadStats,
    ) -> Result<(), StagingError> {
        if self.rows.first().is_some_and(|first| !same_keys(first, &row)) {
            self.flush(log, stats)?;
        }
        self.rows.push(row);
        if self.rows.len() >= self.batch_size {
            self.flush(log, stats)?;
        }
        Ok(())
    }

    /// Mark a document as complete; logged now if nothing of it is pending
    fn finish_file(&mut self, relative: String, log: &mut ControlLog) -> Result<(), StagingError> {
        self.finished_files.push(relative);
        if self.rows.is_empty() {
            self.record_finished(log)?;
        }
        Ok(())
    }

    fn flush(&mut self, log: &mut ControlLog, stats: &mut LoadStats) -> Result<(), StagingError> {
        if !self.rows.is_empty() {
            let result = if self.conflict_keys.is_empty() {
                self.sink.insert_batch(self.table, &self.rows)
            } else {
                self.sink
                    .upsert_batch(self.table, &self.conflict_keys, &self.rows)
            };

            if let Err(e) = result {
                let sql = render_insert_sql(self.table, &self.rows);
                error!(
                    "Batch insert into '{}' failed ({} rows): {}",
                    self.table,
                    self.rows.len(),
                    e
                );
                error!(
                    "Failed batch SQL (truncated):\n{}",
                    truncate_for_log(&sql, MAX_SQL_LOG_BYTES)
                );
                return Err(StagingError::BatchInsert {
                    table: self.table.to_string(),
                    rows: self.rows.len(),
                    message: e.to_string(),
                });
            }

            stats.rows_written += self.rows.len();
            stats.batches += 1;
            self.rows.clear();
        }
        self.record_finished(log)
    }

    fn record_finished(&mut self, log: &mut ControlLog) -> Result<(), StagingError> {
        log.append(self.finished_files.iter().map(String::as_str))?;
        self.finished_files.clear();
        Ok(())
    }
}

/// Load every document under `root` that the control log does not list
///
/// Records are cleaned by [`RecordPreparer`] and written in batches whose rows
/// share one key set. A document enters the control log once all of its rows
/// have reached the sink. A failed batch stops the run with
/// [`StagingError::BatchInsert`] after logging the batch as SQL.
pub fn load_corpus<S: RecordSink + ?Sized>(
    root: &Path,
    sink: &mut S,
    staging: &StagingConfig,
    sizing: &SizingConfig,
    progress: &LoadProgress,
) -> Result<LoadStats, StagingError> {
    let start = Instant::now();
    staging.validate()?;

    let discovery = discover_files(root, &sizing.file_extension)?;
    let log_path = if staging.control_log.is_absolute() {
        staging.control_log.clone()
    } else {
        root.join(&staging.control_log)
    };
    let mut log = ControlLog::load(&log_path)?;

    let mut stats = LoadStats::new();
    stats.files_found = discovery.files.len();

    let pending: Vec<(PathBuf, String)> = discovery
        .files
        .into_iter()
        .map(|path| {
            let relative = relative_path(root, &path);
            (path, relative)
        })
        .filter(|(_, relative)| !log.contains(relative))
        .collect();
    stats.files_skipped = stats.files_found - pending.len();

    if pending.is_empty() {
        if stats.files_found > 0 {
            info!(
                "All {} documents are already listed in {}",
                stats.files_found,
                log.path().display()
            );
        } else {
            info!("No documents found under {}", root.display());
        }
        stats.duration = start.elapsed();
        return Ok(stats);
    }

    info!(
        "Documents found: {}. To process: {}. Batch size: {}",
        stats.files_found,
        pending.len(),
        staging.batch_size
    );

    progress.start(pending.len() as u64);
    let preparer = RecordPreparer::new(staging, sizing);
    let mut writer = BatchWriter {
        sink,
        table: &staging.table,
        conflict_keys: staging.conflict_keys.iter().map(String::as_str).collect(),
        batch_size: staging.batch_size,
        rows: Vec::with_capacity(staging.batch_size),
        finished_files: Vec::new(),
    };

    let outcome = write_documents(
        pending,
        &preparer,
        &mut writer,
        &mut log,
        &mut stats,
        progress,
    );

    stats.duration = start.elapsed();
    match outcome {
        Ok(()) => {
            progress.finish_success(&format!(
                "Loaded {} rows from {} documents",
                stats.rows_written, stats.files_loaded
            ));
            info!(
                "Staging complete: {} rows in {} batches, {} records dropped, {} documents failed",
                stats.rows_written, stats.batches, stats.records_dropped, stats.files_failed
            );
            Ok(stats)
        }
        Err(e) => {
            progress.finish_error(&e.to_string());
            Err(e)
        }
    }
}

fn write_documents<S: RecordSink + ?Sized>(
    pending: Vec<(PathBuf, String)>,
    preparer: &RecordPreparer,
    writer: &mut BatchWriter<'_, S>,
    log: &mut ControlLog,
    stats: &mut LoadStats,
    progress: &LoadProgress,
) -> Result<(), StagingError> {
    for (path, relative) in pending {
        let records = match read_document(&path) {
            Ok(records) => records,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                progress.warn(&format!("{}: {}", relative, e));
                stats.files_failed += 1;
                progress.file_done(&path);
                continue;
            }
        };

        for (index, record) in records.into_iter().enumerate() {
            stats.records_read += 1;
            let Some(record) = record else {
                warn!("{}: element {} is not an object, skipped", relative, index);
                stats.records_dropped += 1;
                continue;
            };
            match preparer.prepare(record) {
                Some(row) => writer.push(row, log, stats)?,
                None => stats.records_dropped += 1,
            }
        }

        writer.finish_file(relative, log)?;
        stats.files_loaded += 1;
        progress.file_done(&path);
    }
    writer.flush(log, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::RawValue;
    use crate::staging::sink::MemorySink;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let root = Path::new("/corpus");
        assert_eq!(
            relative_path(root, Path::new("/corpus/2024/01/a.json")),
            "2024/01/a.json"
        );
    }

    #[test]
    fn test_control_log_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/control.log");

        let mut log = ControlLog::load(&path).unwrap();
        assert!(log.is_empty());
        log.append(["a.json", "sub/b.json"]).unwrap();
        log.append(["a.json"]).unwrap();

        let reloaded = ControlLog::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("sub/b.json"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a.json\nsub/b.json\n");
    }

    #[test]
    fn test_batches_split_on_key_change_and_size() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "a.json",
            r#"[{"id": 1, "x": "a"}, {"id": 2, "x": "b"}, {"id": 3, "x": "c"},
                {"id": 4, "y": "d"}, {"id": 5}]"#,
        );

        let staging = StagingConfig::builder().batch_size(2).build().unwrap();
        let mut sink = MemorySink::new();
        let stats = load_corpus(
            dir.path(),
            &mut sink,
            &staging,
            &SizingConfig::default(),
            &LoadProgress::hidden(),
        )
        .unwrap();

        let sizes: Vec<usize> = sink.batches.iter().map(|(_, rows)| rows.len()).collect();
        assert_eq!(sizes, vec![2, 1, 1, 1]);
        assert_eq!(stats.rows_written, 5);
        assert_eq!(stats.batches, 4);
        for (_, rows) in &sink.batches {
            assert!(rows.iter().all(|r| same_keys(r, &rows[0])));
        }
    }

    #[test]
    fn test_second_run_skips_logged_documents() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", r#"{"id": 1, "relator": "ANA"}"#);
        write(dir.path(), "sub/b.json", r#"[{"id": 2}, {"semId": true}, 7]"#);
        write(dir.path(), "broken.json", "{");

        let staging = StagingConfig::default();
        let sizing = SizingConfig::default();
        let progress = LoadProgress::hidden();

        let mut sink = MemorySink::new();
        let first = load_corpus(dir.path(), &mut sink, &staging, &sizing, &progress).unwrap();
        assert_eq!(first.files_found, 3);
        assert_eq!(first.files_loaded, 2);
        assert_eq!(first.files_failed, 1);
        assert_eq!(first.records_read, 4);
        assert_eq!(first.records_dropped, 2);
        assert_eq!(sink.row_count(), 2);

        let log = fs::read_to_string(dir.path().join("upload_control.log")).unwrap();
        let mut entries: Vec<&str> = log.lines().collect();
        entries.sort();
        assert_eq!(entries, vec!["a.json", "sub/b.json"]);

        let mut sink = MemorySink::new();
        let second = load_corpus(dir.path(), &mut sink, &staging, &sizing, &progress).unwrap();
        assert_eq!(second.files_skipped, 2);
        assert_eq!(second.files_failed, 1);
        assert_eq!(sink.row_count(), 0);
    }

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn insert_batch(&mut self, _table: &str, _rows: &[Record]) -> Result<(), StagingError> {
            Err(StagingError::Database("disk full".to_string()))
        }

        fn upsert_batch(
            &mut self,
            table: &str,
            _conflict_keys: &[&str],
            rows: &[Record],
        ) -> Result<(), StagingError> {
            self.insert_batch(table, rows)
        }
    }

    #[test]
    fn test_failed_batch_aborts_without_logging_documents() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", r#"{"id": 1}"#);

        let result = load_corpus(
            dir.path(),
            &mut FailingSink,
            &StagingConfig::default(),
            &SizingConfig::default(),
            &LoadProgress::hidden(),
        );

        match result {
            Err(StagingError::BatchInsert { table, rows, .. }) => {
                assert_eq!(table, "judged");
                assert_eq!(rows, 1);
            }
            other => panic!("Expected BatchInsert, got {other:?}"),
        }
        assert!(!dir.path().join("upload_control.log").exists());
    }

    #[test]
    fn test_upsert_mode_uses_conflict_keys() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", r#"{"id": 1, "relator": "ANA"}"#);
        write(dir.path(), "b.json", r#"{"id": 1, "relator": "BIA"}"#);

        let staging = StagingConfig::builder()
            .conflict_keys(&["id_origem"])
            .build()
            .unwrap();
        let mut sink = MemorySink::new();
        load_corpus(
            dir.path(),
            &mut sink,
            &staging,
            &SizingConfig::default(),
            &LoadProgress::hidden(),
        )
        .unwrap();

        assert_eq!(sink.row_count(), 1);
        let row = sink.rows().next().unwrap();
        assert_eq!(row["relator"], RawValue::Text("BIA".to_string()));
    }
}
