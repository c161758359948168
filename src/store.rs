use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::constants::artifacts::{
    ALL_SPLITS, ARTIFACT_EXTENSION, BITCODE_PREFIX, DATASET_DIR, DEFAULT_ROOT,
    SIBLING_DATASET_DIR, SPLIT_RECORD_VERSION, TEMP_SUFFIX,
};
use crate::data::SplitData;
use crate::errors::PrepareError;
use crate::splits::SplitLabel;

/// The three splits written together by one preparation run.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedSplits {
    /// Training split.
    pub train: SplitData,
    /// Validation split.
    pub validation: SplitData,
    /// Test split.
    pub test: SplitData,
}

impl PreparedSplits {
    /// Borrow the split for `label`.
    pub fn get(&self, label: SplitLabel) -> &SplitData {
        match label {
            SplitLabel::Train => &self.train,
            SplitLabel::Validation => &self.validation,
            SplitLabel::Test => &self.test,
        }
    }
}

/// Persistence backend for prepared splits.
///
/// `contains` must only report splits that were completely written.
pub trait ArtifactStore: Send + Sync {
    /// Whether a complete artifact exists for `label`.
    fn contains(&self, label: SplitLabel) -> bool;
    /// Load the artifact for `label`, if present.
    fn load(&self, label: SplitLabel) -> Result<Option<SplitData>, PrepareError>;
    /// Persist all three splits; readers never observe a partially written artifact.
    fn store_all(&self, splits: &PreparedSplits) -> Result<(), PrepareError>;
    /// Location reported in errors for `label`.
    fn location(&self, label: SplitLabel) -> PathBuf;

    /// Whether every split is present.
    fn contains_all(&self) -> bool {
        ALL_SPLITS.iter().all(|label| self.contains(*label))
    }
}

/// Directory layout for this dataset and its sibling under one data root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

impl DatasetLayout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Data root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding this dataset's splits.
    pub fn dataset_dir(&self) -> PathBuf {
        self.root.join(DATASET_DIR)
    }

    /// Directory holding the sibling dataset's splits.
    pub fn sibling_dir(&self) -> PathBuf {
        self.root.join(SIBLING_DATASET_DIR)
    }

    /// File store for this dataset.
    pub fn output_store(&self) -> FileArtifactStore {
        FileArtifactStore::new(self.dataset_dir())
    }

    /// File store for the sibling dataset.
    pub fn sibling_store(&self) -> FileArtifactStore {
        FileArtifactStore::new(self.sibling_dir())
    }
}

/// File-backed artifact store: one `<split>.bin` file per split in `dir`.
///
/// Writes go to `<split>.bin.tmp` first and are renamed into place only after
/// all three temporary files are durable.
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl fmt::Debug for FileArtifactStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileArtifactStore")
            .field("dir", &self.dir)
            .finish()
    }
}

impl FileArtifactStore {
    /// Store rooted at `dir`; the directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the artifacts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final artifact path for `label`.
    pub fn artifact_path(&self, label: SplitLabel) -> PathBuf {
        self.dir
            .join(format!("{}.{ARTIFACT_EXTENSION}", label.as_str()))
    }

    fn temp_path(&self, label: SplitLabel) -> PathBuf {
        self.dir.join(format!(
            "{}.{ARTIFACT_EXTENSION}.{TEMP_SUFFIX}",
            label.as_str()
        ))
    }

    /// Write a single split in place (temp file + rename).
    ///
    /// Used to seed sibling datasets; preparation itself goes through `store_all`.
    pub fn store_one(&self, label: SplitLabel, split: &SplitData) -> Result<(), PrepareError> {
        fs::create_dir_all(&self.dir)?;
        let temp = self.temp_path(label);
        write_durable(&temp, &encode_split(split)?)?;
        fs::rename(&temp, self.artifact_path(label))?;
        Ok(())
    }

    fn remove_temps(&self) {
        for label in ALL_SPLITS {
            let _ = fs::remove_file(self.temp_path(label));
        }
    }
}

impl ArtifactStore for FileArtifactStore {
    fn contains(&self, label: SplitLabel) -> bool {
        self.artifact_path(label).is_file()
    }

    fn load(&self, label: SplitLabel) -> Result<Option<SplitData>, PrepareError> {
        let path = self.artifact_path(label);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        decode_split(&bytes)
            .map(Some)
            .map_err(|err| PrepareError::ArtifactStore(format!("{}: {err}", path.display())))
    }

    fn store_all(&self, splits: &PreparedSplits) -> Result<(), PrepareError> {
        fs::create_dir_all(&self.dir)?;
        let staged = ALL_SPLITS.iter().try_for_each(|label| {
            let payload = encode_split(splits.get(*label))?;
            write_durable(&self.temp_path(*label), &payload)
        });
        if let Err(err) = staged {
            self.remove_temps();
            return Err(err);
        }
        for label in ALL_SPLITS {
            fs::rename(self.temp_path(label), self.artifact_path(label))?;
        }
        Ok(())
    }

    fn location(&self, label: SplitLabel) -> PathBuf {
        self.artifact_path(label)
    }
}

/// In-memory artifact store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    splits: RwLock<HashMap<SplitLabel, SplitData>>,
}

impl MemoryArtifactStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one split directly (e.g. a sibling test split).
    pub fn insert(&self, label: SplitLabel, split: SplitData) -> Result<(), PrepareError> {
        split.validate()?;
        self.splits
            .write()
            .map_err(|_| PrepareError::ArtifactStore("memory store lock poisoned".into()))?
            .insert(label, split);
        Ok(())
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn contains(&self, label: SplitLabel) -> bool {
        self.splits
            .read()
            .map(|guard| guard.contains_key(&label))
            .unwrap_or(false)
    }

    fn load(&self, label: SplitLabel) -> Result<Option<SplitData>, PrepareError> {
        Ok(self
            .splits
            .read()
            .map_err(|_| PrepareError::ArtifactStore("memory store lock poisoned".into()))?
            .get(&label)
            .cloned())
    }

    fn store_all(&self, splits: &PreparedSplits) -> Result<(), PrepareError> {
        for label in ALL_SPLITS {
            splits.get(label).validate()?;
        }
        let mut guard = self
            .splits
            .write()
            .map_err(|_| PrepareError::ArtifactStore("memory store lock poisoned".into()))?;
        for label in ALL_SPLITS {
            guard.insert(label, splits.get(label).clone());
        }
        Ok(())
    }

    fn location(&self, label: SplitLabel) -> PathBuf {
        PathBuf::from(format!("memory/{}", label.as_str()))
    }
}

fn write_durable(path: &Path, payload: &[u8]) -> Result<(), PrepareError> {
    let mut file = File::create(path)?;
    file.write_all(payload)?;
    file.sync_all()?;
    Ok(())
}

/// Encode a split as `[version][prefix][bitcode payload]`.
pub fn encode_split(split: &SplitData) -> Result<Vec<u8>, PrepareError> {
    split.validate()?;
    let payload = encode_bitcode_payload(&bitcode::encode(split));
    let mut buf = Vec::with_capacity(1 + payload.len());
    buf.push(SPLIT_RECORD_VERSION);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decode bytes produced by [`encode_split`].
pub fn decode_split(bytes: &[u8]) -> Result<SplitData, PrepareError> {
    let Some((&version, rest)) = bytes.split_first() else {
        return Err(PrepareError::ArtifactStore("empty split record".into()));
    };
    if version != SPLIT_RECORD_VERSION {
        return Err(PrepareError::ArtifactStore(format!(
            "split record version mismatch (expected {SPLIT_RECORD_VERSION}, found {version})"
        )));
    }
    let raw = decode_bitcode_payload(rest)?;
    let split: SplitData = bitcode::decode(raw)
        .map_err(|err| PrepareError::ArtifactStore(format!("corrupt split record: {err}")))?;
    split.validate()?;
    Ok(split)
}

fn encode_bitcode_payload(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + bytes.len());
    out.push(BITCODE_PREFIX);
    out.extend_from_slice(bytes);
    out
}

fn decode_bitcode_payload(bytes: &[u8]) -> Result<&[u8], PrepareError> {
    if bytes.first().copied() != Some(BITCODE_PREFIX) {
        return Err(PrepareError::ArtifactStore(
            "bitcode payload missing expected prefix".into(),
        ));
    }
    Ok(&bytes[1..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn split(env: i64, len: usize) -> SplitData {
        SplitData::new(
            (0..len).map(|i| [i as f32, 1.0, 2.0, 1.0, 3.0]).collect(),
            vec![env % 2; len],
            vec![env; len],
        )
        .unwrap()
    }

    fn prepared() -> PreparedSplits {
        PreparedSplits {
            train: split(0, 8),
            validation: split(1, 2),
            test: split(3, 5),
        }
    }

    #[test]
    fn file_store_persists_all_splits() {
        let dir = tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path().join("nested"));
        assert!(!store.contains_all());
        assert!(store.load(SplitLabel::Train).unwrap().is_none());

        let splits = prepared();
        store.store_all(&splits).unwrap();

        assert!(store.contains_all());
        for label in ALL_SPLITS {
            assert_eq!(store.load(label).unwrap().as_ref(), Some(splits.get(label)));
            assert!(!store.temp_path(label).exists());
        }
        assert!(store.artifact_path(SplitLabel::Validation).ends_with("val.bin"));
    }

    #[test]
    fn temp_files_do_not_count_as_artifacts() {
        let dir = tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());
        for label in ALL_SPLITS {
            fs::write(store.temp_path(label), b"partial").unwrap();
        }
        assert!(!store.contains(SplitLabel::Train));
        assert!(!store.contains_all());
    }

    #[test]
    fn partial_artifact_set_is_not_complete() {
        let dir = tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());
        store.store_one(SplitLabel::Train, &split(0, 3)).unwrap();
        assert!(store.contains(SplitLabel::Train));
        assert!(!store.contains_all());
    }

    #[test]
    fn load_reports_corrupt_artifact_with_path() {
        let dir = tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());
        fs::write(store.artifact_path(SplitLabel::Test), [SPLIT_RECORD_VERSION, 0x00]).unwrap();
        let err = store.load(SplitLabel::Test).unwrap_err();
        assert!(matches!(
            err,
            PrepareError::ArtifactStore(ref msg)
                if msg.contains("test.bin") && msg.contains("missing expected prefix")
        ));
    }

    #[test]
    fn decode_rejects_empty_version_mismatch_and_corrupt_payloads() {
        assert!(matches!(
            decode_split(&[]),
            Err(PrepareError::ArtifactStore(msg)) if msg.contains("empty")
        ));
        assert!(matches!(
            decode_split(&[SPLIT_RECORD_VERSION.wrapping_add(1), BITCODE_PREFIX]),
            Err(PrepareError::ArtifactStore(msg)) if msg.contains("version mismatch")
        ));
        assert!(matches!(
            decode_split(&[SPLIT_RECORD_VERSION, BITCODE_PREFIX, 0xFF, 0xEE]),
            Err(PrepareError::ArtifactStore(msg)) if msg.contains("corrupt split record")
        ));
    }

    #[test]
    fn decode_rejects_unequal_lengths() {
        let bad = SplitData {
            features: vec![[0.0; 5]; 2],
            labels: vec![0],
            environments: vec![0, 0],
        };
        let mut bytes = vec![SPLIT_RECORD_VERSION];
        bytes.extend(encode_bitcode_payload(&bitcode::encode(&bad)));
        assert!(matches!(
            decode_split(&bytes),
            Err(PrepareError::InconsistentLengths { .. })
        ));
        assert!(encode_split(&bad).is_err());
    }

    #[test]
    fn memory_store_behaves_like_file_store() {
        let store = MemoryArtifactStore::new();
        assert!(!store.contains_all());
        store.insert(SplitLabel::Test, split(2, 4)).unwrap();
        assert!(store.contains(SplitLabel::Test));
        assert!(!store.contains_all());

        let splits = prepared();
        store.store_all(&splits).unwrap();
        assert!(store.contains_all());
        assert_eq!(store.load(SplitLabel::Test).unwrap().unwrap(), splits.test);
        assert_eq!(
            store.location(SplitLabel::Validation),
            PathBuf::from("memory/val")
        );
    }

    #[test]
    fn layout_places_dataset_and_sibling_under_root() {
        let layout = DatasetLayout::new("/data");
        assert_eq!(
            layout.output_store().artifact_path(SplitLabel::Train),
            PathBuf::from("/data/four_env_synthetic_folktables/train.bin")
        );
        assert_eq!(
            layout.sibling_store().location(SplitLabel::Test),
            PathBuf::from("/data/synthetic_folktables/test.bin")
        );
        assert_eq!(DatasetLayout::default().root(), Path::new("./data"));
        assert!(format!("{:?}", layout.output_store()).contains("FileArtifactStore"));
    }
}
