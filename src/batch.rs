// Bulk import with per-line error tolerance
//
// One candidate record per line: the identity number is the first
// whitespace-delimited token, the remaining tokens joined form the name.
// Bad lines only bump the failure count; a whole-file problem (missing,
// unreadable, not UTF-8) aborts the batch.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::area::AreaIndex;
use crate::checksum;
use crate::error::{RegistryError, Result};
use crate::store::{InsertOutcome, RecordStore};

/// Aggregate counts for one batch run. Lines that are already present
/// with the identical number count as neither success nor failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub success: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total_processed(&self) -> usize {
        self.success + self.failed
    }
}

/// Progress notifications emitted by a background import. The caller
/// drains these on its own thread; the import thread never touches
/// caller state directly.
#[derive(Debug)]
pub enum ImportEvent {
    /// Counts after another line was settled.
    Progress(BatchSummary),
    /// The batch ran to completion.
    Finished(BatchSummary),
    /// The batch was aborted by a whole-file error.
    Failed(RegistryError),
}

/// Imports candidate lines into the store.
///
/// Blank lines are skipped outright. A line with fewer than two tokens,
/// a failing checksum, or a name conflict counts as a failure and
/// processing continues; an I/O error on the log aborts the batch.
pub fn import_lines<'a, I>(
    store: &mut RecordStore,
    index: &AreaIndex,
    lines: I,
) -> Result<BatchSummary>
where
    I: IntoIterator<Item = &'a str>,
{
    import_lines_with(store, index, lines, |_| {})
}

fn import_lines_with<'a, I, F>(
    store: &mut RecordStore,
    index: &AreaIndex,
    lines: I,
    mut on_progress: F,
) -> Result<BatchSummary>
where
    I: IntoIterator<Item = &'a str>,
    F: FnMut(BatchSummary),
{
    let mut summary = BatchSummary::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(id_number) = tokens.next() else {
            continue;
        };
        let name_tokens: Vec<&str> = tokens.collect();
        if name_tokens.is_empty() {
            summary.failed += 1;
            on_progress(summary);
            continue;
        }
        let name = name_tokens.join(" ");

        if !checksum::validate(id_number) {
            summary.failed += 1;
            on_progress(summary);
            continue;
        }

        match store.insert(&name, id_number, index) {
            Ok(InsertOutcome::Inserted) => summary.success += 1,
            // identical record already stored: not counted either way
            Ok(InsertOutcome::AlreadyPresent) => continue,
            Err(err) if err.is_recoverable() => summary.failed += 1,
            Err(err) => return Err(err),
        }
        on_progress(summary);
    }

    Ok(summary)
}

/// Imports a whole file. The file must be UTF-8; non-UTF-8 content is a
/// distinct [`RegistryError::Encoding`] rather than a decode guess, and
/// like a missing file it fails the entire batch.
pub fn import_file(
    store: &mut RecordStore,
    index: &AreaIndex,
    path: &Path,
) -> Result<BatchSummary> {
    let text = read_utf8(path)?;
    import_lines(store, index, text.lines())
}

fn read_utf8(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    String::from_utf8(bytes).map_err(|_| RegistryError::Encoding {
        path: path.to_path_buf(),
    })
}

/// Runs a batch import on a dedicated background thread.
///
/// The one long-running operation in the system: the caller thread stays
/// free for new input and receives [`ImportEvent`]s over the channel,
/// ending with `Finished` or `Failed`. All store access goes through the
/// mutex-guarded handle, which also serializes the batch against
/// interactive inserts. Not cancellable once started.
pub fn spawn_import(
    store: Arc<Mutex<RecordStore>>,
    index: Arc<AreaIndex>,
    path: PathBuf,
    events: Sender<ImportEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let result = read_utf8(&path).and_then(|text| {
            let mut store = match store.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            import_lines_with(&mut store, &index, text.lines(), |summary| {
                let _ = events.send(ImportEvent::Progress(summary));
            })
        });
        let terminal = match result {
            Ok(summary) => ImportEvent::Finished(summary),
            Err(err) => ImportEvent::Failed(err),
        };
        let _ = events.send(terminal);
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::{build_area_index, AreaNode};
    use std::sync::mpsc;

    fn test_index() -> AreaIndex {
        let tree: Vec<AreaNode> = serde_json::from_str(
            r#"[
              {"code": "110000", "name": "北京市", "level": 1, "children": [
                {"code": "110100", "name": "市辖区", "level": 2, "children": [
                  {"code": "110105", "name": "朝阳区", "level": 3}
                ]}
              ]}
            ]"#,
        )
        .unwrap();
        build_area_index(&tree)
    }

    fn fresh_store(dir: &tempfile::TempDir) -> RecordStore {
        RecordStore::load(dir.path().join("database.sfz")).unwrap()
    }

    #[test]
    fn test_mixed_batch_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = fresh_store(&dir);
        let index = test_index();

        // one good line, one with a single token, one failing checksum
        let summary = import_lines(
            &mut store,
            &index,
            [
                "11010519491231002X 张三",
                "only-one-token",
                "110105194912310020 李四",
            ],
        )
        .unwrap();

        assert_eq!(summary.success, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.total_processed(), 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_blank_lines_skipped_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = fresh_store(&dir);
        let index = test_index();

        let summary =
            import_lines(&mut store, &index, ["", "   ", "11010519491231002X 张三", ""]).unwrap();
        assert_eq!(summary.success, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.total_processed(), 1);
    }

    #[test]
    fn test_multi_token_name_joined_with_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = fresh_store(&dir);
        let index = test_index();

        import_lines(&mut store, &index, ["110105200001010016 欧阳 复姓"]).unwrap();
        assert!(store.lookup("欧阳 复姓").is_some());
    }

    #[test]
    fn test_duplicate_identical_counts_as_neither() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = fresh_store(&dir);
        let index = test_index();

        store.insert("张三", "11010519491231002X", &index).unwrap();
        let summary =
            import_lines(&mut store, &index, ["11010519491231002X 张三"]).unwrap();
        assert_eq!(summary, BatchSummary::default());
    }

    #[test]
    fn test_conflict_counts_as_failure_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = fresh_store(&dir);
        let index = test_index();

        store.insert("张三", "11010519491231002X", &index).unwrap();
        let summary = import_lines(
            &mut store,
            &index,
            [
                "110105194912310038 张三",
                "110105200001010016 李四",
            ],
        )
        .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.success, 1);
        assert_eq!(store.lookup("张三").unwrap().id_number, "11010519491231002X");
    }

    #[test]
    fn test_import_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = fresh_store(&dir);
        let index = test_index();

        let err = import_file(&mut store, &index, Path::new("/nonexistent/batch.txt")).unwrap_err();
        assert!(matches!(err, RegistryError::Io(_)));
    }

    #[test]
    fn test_import_file_rejects_non_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.txt");
        // GBK-encoded bytes, not valid UTF-8
        fs::write(&path, [0xd5u8, 0xc5, 0xc8, 0xfd, 0x0a]).unwrap();

        let mut store = fresh_store(&dir);
        let index = test_index();
        let err = import_file(&mut store, &index, &path).unwrap_err();
        assert!(matches!(err, RegistryError::Encoding { .. }));
    }

    #[test]
    fn test_background_import_reports_terminal_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.txt");
        fs::write(
            &path,
            "11010519491231002X 张三\nbad-line\n110105200001010016 李四\n",
        )
        .unwrap();

        let store = Arc::new(Mutex::new(fresh_store(&dir)));
        let index = Arc::new(test_index());
        let (tx, rx) = mpsc::channel();

        let handle = spawn_import(store.clone(), index, path, tx);

        let mut progress_seen = 0;
        let mut finished = None;
        for event in rx {
            match event {
                ImportEvent::Progress(_) => progress_seen += 1,
                ImportEvent::Finished(summary) => finished = Some(summary),
                ImportEvent::Failed(err) => panic!("unexpected failure: {}", err),
            }
        }
        handle.join().unwrap();

        let summary = finished.expect("missing terminal event");
        assert_eq!(summary.success, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(progress_seen, summary.total_processed());
        assert_eq!(store.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_background_import_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Mutex::new(fresh_store(&dir)));
        let (tx, rx) = mpsc::channel();

        let handle = spawn_import(
            store,
            Arc::new(test_index()),
            PathBuf::from("/nonexistent/batch.txt"),
            tx,
        );

        let events: Vec<ImportEvent> = rx.iter().collect();
        handle.join().unwrap();
        assert!(matches!(
            events.as_slice(),
            [ImportEvent::Failed(RegistryError::Io(_))]
        ));
    }
}
