//! Corpus walking and document parsing

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::IngestError;
use super::progress::ScanProgress;
use crate::inference::{FieldTypeAccumulator, Record, SizingConfig, record_from_json};

/// Counters collected while walking a corpus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatistics {
    /// Directories visited, the root included
    pub folders: usize,
    /// Documents found with the configured extension
    pub files: usize,
    /// Top-level objects (or array elements) seen
    pub records: usize,
    /// Documents skipped on read or parse errors
    pub failed_files: usize,
}

impl ScanStatistics {
    /// Add the counters of another scan
    pub fn absorb(&mut self, other: &ScanStatistics) {
        self.folders += other.folders;
        self.files += other.files;
        self.records += other.records;
        self.failed_files += other.failed_files;
    }
}

/// Files found under a root
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Matching documents, sorted by path
    pub files: Vec<PathBuf>,
    /// Directories visited, the root included
    pub folders: usize,
}

/// Result of scanning a corpus
#[derive(Debug, Clone)]
pub struct CorpusScan {
    pub accumulator: FieldTypeAccumulator,
    pub statistics: ScanStatistics,
}

/// Fail unless `root` is an existing directory
pub fn check_root(root: &Path) -> Result<(), IngestError> {
    if !root.exists() {
        return Err(IngestError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(IngestError::NotADirectory(root.to_path_buf()));
    }
    Ok(())
}

/// Recursively find documents ending in `extension` under `root`
pub fn discover_files(root: &Path, extension: &str) -> Result<Discovery, IngestError> {
    check_root(root)?;

    let Some(root_str) = root.to_str() else {
        return Err(IngestError::InvalidPattern(format!(
            "{} is not valid UTF-8",
            root.display()
        )));
    };
    let pattern = format!("{}/**/*", glob::Pattern::escape(root_str.trim_end_matches('/')));

    let entries = glob::glob(&pattern)
        .map_err(|e| IngestError::InvalidPattern(format!("{}: {}", pattern, e)))?;

    let mut discovery = Discovery {
        files: Vec::new(),
        folders: 1,
    };

    for entry in entries {
        match entry {
            Ok(path) => {
                if path.is_dir() {
                    discovery.folders += 1;
                } else if path.is_file() && has_extension(&path, extension) {
                    discovery.files.push(path);
                }
            }
            Err(e) => {
                // Log but continue
                warn!("Error accessing path: {}", e);
            }
        }
    }

    // Sort by path for consistent ordering
    discovery.files.sort();

    Ok(discovery)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(extension))
}

/// Parse one document into its records
///
/// A top-level object is one record, an array yields one entry per element.
/// Elements that are not objects come back as `None`: they count as records
/// but carry no fields.
pub fn read_document(path: &Path) -> Result<Vec<Option<Record>>, IngestError> {
    let content = fs::read_to_string(path).map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let value: Value = serde_json::from_str(&content).map_err(|e| IngestError::JsonParse {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    match value {
        Value::Object(map) => Ok(vec![Some(record_from_json(map))]),
        Value::Array(items) => Ok(items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Some(record_from_json(map)),
                _ => None,
            })
            .collect()),
        other => Err(IngestError::InvalidDocument {
            path: path.to_path_buf(),
            reason: format!("expected object or array, found {}", value_type_name(&other)),
        }),
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Walk `root` and accumulate the field types of every record
pub fn scan_corpus(
    root: &Path,
    config: &SizingConfig,
    progress: &ScanProgress,
) -> Result<CorpusScan, IngestError> {
    let discovery = discover_files(root, &config.file_extension)?;
    info!(
        "Scanning {} ({} documents in {} folders)",
        root.display(),
        discovery.files.len(),
        discovery.folders
    );

    let mut accumulator = FieldTypeAccumulator::new(config);
    let mut statistics = ScanStatistics {
        folders: discovery.folders,
        ..Default::default()
    };

    for path in &discovery.files {
        statistics.files += 1;
        progress.file(path, statistics.records);

        let records = match read_document(path) {
            Ok(records) => records,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                statistics.failed_files += 1;
                continue;
            }
        };

        debug!("{}: {} records", path.display(), records.len());
        for record in records {
            statistics.records += 1;
            if let Some(record) = record {
                accumulator.observe_record(&record);
            }
        }
    }

    progress.finish(&statistics);
    Ok(CorpusScan {
        accumulator,
        statistics,
    })
}

/// Scan several roots and merge them in argument order
pub fn scan_roots(
    roots: &[PathBuf],
    config: &SizingConfig,
    progress: &ScanProgress,
) -> Result<CorpusScan, IngestError> {
    // Fail before any scanning if a root is unusable
    for root in roots {
        check_root(root)?;
    }

    let mut combined = CorpusScan {
        accumulator: FieldTypeAccumulator::new(config),
        statistics: ScanStatistics::default(),
    };

    for root in roots {
        let scan = scan_corpus(root, config, progress)?;
        combined.accumulator.merge(scan.accumulator);
        combined.statistics.absorb(&scan.statistics);
    }

    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{FieldType, RawValue};
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut f = File::create(&path).unwrap();
        write!(f, "{}", content).unwrap();
        path
    }

    #[test]
    fn test_discover_counts_folders_and_filters_extension() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", "{}");
        write(dir.path(), "notes.txt", "x");
        write(dir.path(), "2024/01/b.json", "{}");
        write(dir.path(), "2024/02/c.JSON", "{}");

        let discovery = discover_files(dir.path(), ".json").unwrap();
        assert_eq!(discovery.files.len(), 2);
        // root, 2024, 2024/01, 2024/02
        assert_eq!(discovery.folders, 4);
    }

    #[test]
    fn test_discover_missing_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            discover_files(&missing, ".json"),
            Err(IngestError::RootNotFound(_))
        ));

        let file = write(dir.path(), "file.json", "{}");
        assert!(matches!(
            discover_files(&file, ".json"),
            Err(IngestError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_read_document_shapes() {
        let dir = TempDir::new().unwrap();
        let object = write(dir.path(), "one.json", r#"{"id": 1, "classe": "REsp"}"#);
        let array = write(dir.path(), "many.json", r#"[{"id": 2}, 3, {"id": 4}]"#);
        let scalar = write(dir.path(), "scalar.json", "42");
        let broken = write(dir.path(), "broken.json", "{\"id\": ");

        let records = read_document(&object).unwrap();
        assert_eq!(records.len(), 1);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record["id_origem"], RawValue::Integer(1));

        let records = read_document(&array).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[1].is_none());

        assert!(matches!(
            read_document(&scalar),
            Err(IngestError::InvalidDocument { .. })
        ));
        assert!(matches!(
            read_document(&broken),
            Err(IngestError::JsonParse { .. })
        ));
    }

    #[test]
    fn test_scan_corpus_skips_bad_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", r#"[{"id": 1, "valor": 10}, {"id": 2, "valor": 2.5}]"#);
        write(dir.path(), "sub/b.json", r#"{"id": 3, "relator": null}"#);
        write(dir.path(), "sub/bad.json", "not json");

        let progress = ScanProgress::hidden();
        let scan = scan_corpus(dir.path(), &SizingConfig::default(), &progress).unwrap();

        assert_eq!(scan.statistics.folders, 2);
        assert_eq!(scan.statistics.files, 3);
        assert_eq!(scan.statistics.records, 3);
        assert_eq!(scan.statistics.failed_files, 1);
        assert_eq!(
            scan.accumulator.get("valor").unwrap().field_type,
            FieldType::Float
        );
        assert_eq!(
            scan.accumulator.get("relator").unwrap().field_type,
            FieldType::Unknown
        );
        assert!(scan.accumulator.get("id").is_none());
    }
}
