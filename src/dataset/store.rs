use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use crate::dataset::{DatasetCoverage, DatasetError, DatasetStatus, ProgrammeSnapshot};
use crate::programme::ProgrammeRecord;

/// Cached programme dataset keyed on the source file's modification time.
/// The snapshot is swapped atomically under a short write lock; a failed
/// reload keeps serving the last good snapshot.
pub struct ProgrammeStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    snapshot: Option<Arc<ProgrammeSnapshot>>,
    source_mtime: Option<SystemTime>,
    generation: u64,
}

impl ProgrammeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(StoreState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current snapshot, reloading first when the source file's
    /// modification time no longer matches the one the snapshot was built
    /// from. When a reload fails but a previous snapshot exists, the stale
    /// snapshot is returned and the failure is logged.
    pub fn snapshot(&self) -> Result<Arc<ProgrammeSnapshot>, DatasetError> {
        let current_mtime = self.source_mtime().ok();
        {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(snapshot) = &state.snapshot {
                if current_mtime.is_some() && state.source_mtime == current_mtime {
                    return Ok(Arc::clone(snapshot));
                }
            }
        }
        self.reload()
    }

    /// Reloads unconditionally, bypassing the modification-time check.
    pub fn force_reload(&self) -> Result<Arc<ProgrammeSnapshot>, DatasetError> {
        self.reload()
    }

    pub fn status(&self) -> DatasetStatus {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        DatasetStatus {
            path: self.path.clone(),
            loaded: state.snapshot.is_some(),
            generation: state.generation,
            loaded_at: state.snapshot.as_ref().map(|s| s.loaded_at),
            coverage: state
                .snapshot
                .as_ref()
                .map(|s| s.coverage())
                .unwrap_or_else(DatasetCoverage::default),
        }
    }

    fn reload(&self) -> Result<Arc<ProgrammeSnapshot>, DatasetError> {
        match self.load_from_disk() {
            Ok((programmes, mtime)) => {
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                state.generation += 1;
                let snapshot = Arc::new(ProgrammeSnapshot::new(programmes, state.generation));
                state.snapshot = Some(Arc::clone(&snapshot));
                state.source_mtime = mtime;
                tracing::info!(
                    path = %self.path.display(),
                    generation = state.generation,
                    programmes = snapshot.programmes.len(),
                    "programme dataset loaded"
                );
                Ok(snapshot)
            }
            Err(err) => {
                let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
                if let Some(snapshot) = &state.snapshot {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %err,
                        "dataset reload failed, serving previous snapshot"
                    );
                    return Ok(Arc::clone(snapshot));
                }
                Err(err)
            }
        }
    }

    fn load_from_disk(&self) -> Result<(Vec<ProgrammeRecord>, Option<SystemTime>), DatasetError> {
        let mtime = self.source_mtime().ok();
        let data = fs::read_to_string(&self.path).map_err(|source| DatasetError::Io {
            path: self.path.clone(),
            source,
        })?;
        let programmes: Vec<ProgrammeRecord> =
            serde_json::from_str(&data).map_err(|source| DatasetError::Parse {
                path: self.path.clone(),
                source,
            })?;
        if programmes.is_empty() {
            return Err(DatasetError::Empty {
                path: self.path.clone(),
            });
        }
        Ok((programmes, mtime))
    }

    fn source_mtime(&self) -> Result<SystemTime, std::io::Error> {
        fs::metadata(&self.path).and_then(|m| m.modified())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn dataset_json(codes: &[&str]) -> String {
        let records: Vec<String> = codes
            .iter()
            .map(|code| {
                format!(
                    r#"{{"code": "{code}", "institution": "Test U", "score_md": 16.0}}"#
                )
            })
            .collect();
        format!("[{}]", records.join(","))
    }

    fn write_dataset(path: &Path, codes: &[&str]) {
        let mut file = fs::File::create(path).expect("create dataset");
        file.write_all(dataset_json(codes).as_bytes())
            .expect("write dataset");
        file.sync_all().expect("sync dataset");
    }

    #[test]
    fn loads_and_caches_until_the_file_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("programmes.json");
        write_dataset(&path, &["JS1001"]);

        let store = ProgrammeStore::new(&path);
        let first = store.snapshot().expect("first load");
        assert_eq!(first.generation, 1);
        assert_eq!(first.programmes.len(), 1);

        let cached = store.snapshot().expect("cached");
        assert_eq!(cached.generation, 1);
        assert!(Arc::ptr_eq(&first, &cached));

        // Rewriting the file moves the mtime and invalidates the snapshot.
        // Some filesystems have coarse mtime resolution, so nudge it.
        write_dataset(&path, &["JS1001", "JS1002"]);
        let far_future = SystemTime::now() + std::time::Duration::from_secs(5);
        let file = fs::File::options().append(true).open(&path).expect("open");
        file.set_modified(far_future).expect("set mtime");

        let reloaded = store.snapshot().expect("reload");
        assert_eq!(reloaded.generation, 2);
        assert_eq!(reloaded.programmes.len(), 2);
    }

    #[test]
    fn force_reload_bumps_the_generation_without_a_file_change() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("programmes.json");
        write_dataset(&path, &["JS1001"]);

        let store = ProgrammeStore::new(&path);
        store.snapshot().expect("first load");
        let reloaded = store.force_reload().expect("forced reload");
        assert_eq!(reloaded.generation, 2);
    }

    #[test]
    fn failed_reload_keeps_the_last_good_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("programmes.json");
        write_dataset(&path, &["JS1001"]);

        let store = ProgrammeStore::new(&path);
        let first = store.snapshot().expect("first load");

        fs::write(&path, "not json").expect("corrupt dataset");
        let file = fs::File::options().append(true).open(&path).expect("open");
        file.set_modified(SystemTime::now() + std::time::Duration::from_secs(5))
            .expect("set mtime");

        let fallback = store.snapshot().expect("fallback");
        assert_eq!(fallback.generation, first.generation);
        assert_eq!(fallback.programmes.len(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error_when_nothing_is_cached() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ProgrammeStore::new(dir.path().join("absent.json"));
        let err = store.snapshot().expect_err("missing file");
        assert!(matches!(err, DatasetError::Io { .. }));
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("programmes.json");
        fs::write(&path, "[]").expect("write dataset");
        let store = ProgrammeStore::new(&path);
        let err = store.snapshot().expect_err("empty dataset");
        assert!(matches!(err, DatasetError::Empty { .. }));
    }

    #[test]
    fn status_reports_quartile_coverage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("programmes.json");
        fs::write(
            &path,
            r#"[
                {"code": "JS1001", "score_uq": 20.0, "score_md": 16.0, "score_lq": 12.0},
                {"code": "JS1002", "score_md": 14.0},
                {"code": "JS1003", "active": false}
            ]"#,
        )
        .expect("write dataset");

        let store = ProgrammeStore::new(&path);
        store.snapshot().expect("load");
        let status = store.status();
        assert!(status.loaded);
        assert_eq!(status.generation, 1);
        assert_eq!(status.coverage.total, 3);
        assert_eq!(status.coverage.active, 2);
        assert_eq!(status.coverage.with_upper_quartile, 1);
        assert_eq!(status.coverage.with_median, 2);
        assert_eq!(status.coverage.with_lower_quartile, 1);
    }
}
