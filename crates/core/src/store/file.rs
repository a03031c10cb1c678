use super::{Collections, Store, WriteBatch};
use crate::bed::Bed;
use crate::error::{StoreError, StoreResult};
use crate::patient::Patient;
use crate::request::BedRequest;
use bedflow_types::BedNumber;
use bedflow_uuid::{PatientCode, RecordUuid};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

/// Store persisted as a single YAML document.
///
/// Reads are served from memory. Each commit writes the whole document to a sibling temporary
/// file and renames it over the original, so a crash leaves either the old or the new document
/// on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: RwLock<Collections>,
}

impl FileStore {
    /// Opens `path`, starting empty if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// `StoreError::FileRead` if the file exists but cannot be read, or
    /// `StoreError::Deserialization` if it is not a valid store document.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let collections = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Collections::default(),
            Ok(raw) => serde_yaml::from_str(&raw).map_err(StoreError::Deserialization)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collections::default(),
            Err(e) => return Err(StoreError::FileRead(e)),
        };
        tracing::info!(path = %path.display(), "opened store file");
        Ok(Self {
            path,
            inner: RwLock::new(collections),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn persist(&self, collections: &Collections) -> StoreResult<()> {
        let raw = serde_yaml::to_string(collections).map_err(StoreError::Serialization)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(StoreError::FileWrite)?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let mut file = fs::File::create(&tmp).map_err(StoreError::FileWrite)?;
        file.write_all(raw.as_bytes())
            .map_err(StoreError::FileWrite)?;
        file.sync_all().map_err(StoreError::FileWrite)?;
        fs::rename(&tmp, &self.path).map_err(StoreError::FileWrite)
    }
}

impl Store for FileStore {
    fn beds(&self) -> StoreResult<Vec<Bed>> {
        Ok(self.read()?.beds())
    }

    fn bed(&self, number: &BedNumber) -> StoreResult<Option<Bed>> {
        Ok(self.read()?.bed(number))
    }

    fn patients(&self) -> StoreResult<Vec<Patient>> {
        Ok(self.read()?.patients())
    }

    fn patient(&self, id: &RecordUuid) -> StoreResult<Option<Patient>> {
        Ok(self.read()?.patient(id))
    }

    fn patient_code_exists(&self, code: &PatientCode) -> StoreResult<bool> {
        Ok(self.read()?.patient_code_exists(code))
    }

    fn requests(&self) -> StoreResult<Vec<BedRequest>> {
        Ok(self.read()?.requests())
    }

    fn request(&self, id: &RecordUuid) -> StoreResult<Option<BedRequest>> {
        Ok(self.read()?.request(id))
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<WriteBatch> {
        let mut guard = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let mut next = guard.clone();
        let committed = next.apply(batch)?;
        self.persist(&next)?;
        *guard = next;
        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bed::BedStatus;
    use crate::store::test_support::bed;
    use tempfile::TempDir;

    #[test]
    fn test_commit_survives_reopen() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("beds.yaml");

        let store = FileStore::open(&path).expect("missing file opens empty");
        let mut batch = WriteBatch::new();
        batch
            .put_bed(bed("ICU-002", "ICU", &["Ventilator"]))
            .put_bed(bed("ICU-001", "ICU", &[]));
        store.commit(batch).expect("commit");
        assert!(path.exists(), "commit should create the document");
        assert!(
            !dir.path().join("nested").join("beds.yaml.tmp").exists(),
            "temporary file should be renamed away"
        );

        let reopened = FileStore::open(&path).expect("reopen");
        let beds = reopened.beds().unwrap();
        let numbers: Vec<&str> = beds.iter().map(|b| b.number.as_str()).collect();
        assert_eq!(numbers, ["ICU-001", "ICU-002"]);
        assert_eq!(beds[1].equipment.len(), 1);
        assert_eq!(beds[0].version, 1);
    }

    #[test]
    fn test_rejected_commit_leaves_file_untouched() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("beds.yaml");
        let store = FileStore::open(&path).unwrap();

        let mut batch = WriteBatch::new();
        batch.put_bed(bed("ICU-001", "ICU", &[]));
        store.commit(batch.clone()).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let mut stale = bed("ICU-001", "ICU", &[]);
        stale.status = BedStatus::Maintenance;
        let mut batch = WriteBatch::new();
        batch.put_bed(stale);
        assert!(store.commit(batch).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_open_rejects_garbage() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("beds.yaml");
        fs::write(&path, "beds: [not, a, bed]").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(StoreError::Deserialization(_))
        ));
    }
}
