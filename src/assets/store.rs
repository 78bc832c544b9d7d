//! Content-addressed local storage for model and OCR-language assets.
//!
//! Layout is deterministic per category: `<root>/models/<id>/...`,
//! `<root>/stt/<id>/...`, `<root>/tessdata/<lang>.traineddata`. Files are
//! only ever placed by atomic rename, so a reader polling a final path never
//! observes a partial write.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use super::catalog::{AssetDescriptor, AssetKind};

const CHECKSUM_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for one asset under its category, creating intermediate
    /// directories as needed.
    pub fn resolve_path(&self, category: &str, id: &str) -> Result<PathBuf> {
        let dir = self.root.join(category).join(id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create asset directory {}", dir.display()))?;
        Ok(dir)
    }

    /// Location of a legacy-OCR trained-data file for `language`.
    /// Does not create anything; presence is checked by the caller.
    pub fn tessdata_path(&self, language: &str) -> PathBuf {
        self.root
            .join(AssetKind::TessData.category())
            .join(format!("{language}.traineddata"))
    }

    /// Final install location for a catalog asset, with its directory created.
    pub fn destination_for(&self, descriptor: &AssetDescriptor) -> Result<PathBuf> {
        match descriptor.kind {
            AssetKind::TessData => {
                let dir = self.root.join(AssetKind::TessData.category());
                fs::create_dir_all(&dir).with_context(|| {
                    format!("failed to create tessdata directory {}", dir.display())
                })?;
                Ok(dir.join(format!("{}.traineddata", descriptor.id)))
            }
            kind => {
                let dir = self.resolve_path(kind.category(), &descriptor.id)?;
                Ok(dir.join(descriptor.file_name()))
            }
        }
    }

    /// Stream `path` through SHA-256 in fixed-size chunks and compare against
    /// `expected_hex`, case-insensitively. Never buffers the whole file.
    pub fn verify_checksum(path: &Path, expected_hex: &str) -> Result<bool> {
        let mut file = fs::File::open(path)
            .with_context(|| format!("failed to open {} for checksum", path.display()))?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; CHECKSUM_CHUNK_BYTES];
        loop {
            let read = file
                .read(&mut buf)
                .with_context(|| format!("failed to read {}", path.display()))?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        let actual = format!("{:x}", hasher.finalize());
        Ok(actual.eq_ignore_ascii_case(expected_hex.trim()))
    }

    /// Move a fully-written temp file into its final location with a single
    /// rename. The temp file must live on the same volume as the target.
    pub fn install_atomic(temp: &Path, dest: &Path) -> Result<()> {
        fs::rename(temp, dest).with_context(|| {
            format!(
                "atomic install failed: {} -> {}",
                temp.display(),
                dest.display()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("screentalk-store-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sha256_hex(data: &[u8]) -> String {
        format!("{:x}", Sha256::digest(data))
    }

    #[test]
    fn resolve_path_creates_directories() {
        let root = scratch_dir();
        let store = AssetStore::new(&root);
        let dir = store.resolve_path("models", "default").unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir, root.join("models").join("default"));
    }

    #[test]
    fn checksum_matches_any_case_and_detects_corruption() {
        let root = scratch_dir();
        let path = root.join("payload.bin");
        let mut data = vec![7u8; 4096];
        fs::write(&path, &data).unwrap();

        let digest = sha256_hex(&data);
        assert!(AssetStore::verify_checksum(&path, &digest).unwrap());
        assert!(AssetStore::verify_checksum(&path, &digest.to_uppercase()).unwrap());

        // Flip a single byte; verification must fail.
        data[1234] ^= 0x01;
        fs::write(&path, &data).unwrap();
        assert!(!AssetStore::verify_checksum(&path, &digest).unwrap());
    }

    #[test]
    fn install_atomic_replaces_file_in_one_step() {
        let root = scratch_dir();
        let temp = root.join("payload.part");
        let dest = root.join("payload.bin");
        fs::write(&temp, b"complete payload").unwrap();
        AssetStore::install_atomic(&temp, &dest).unwrap();
        assert!(!temp.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"complete payload");
    }

    #[test]
    fn install_atomic_never_exposes_partial_content() {
        let root = scratch_dir();
        let temp = root.join("model.part");
        let dest = root.join("model.gguf");
        let payload = vec![42u8; 4 * 1024 * 1024];

        {
            let mut file = fs::File::create(&temp).unwrap();
            file.write_all(&payload).unwrap();
            file.flush().unwrap();
        }

        let poll_dest = dest.clone();
        let expected_len = payload.len() as u64;
        let poller = std::thread::spawn(move || {
            for _ in 0..50_000 {
                if let Ok(meta) = fs::metadata(&poll_dest) {
                    assert_eq!(meta.len(), expected_len, "observed a partial install");
                    return true;
                }
            }
            false
        });

        AssetStore::install_atomic(&temp, &dest).unwrap();
        poller.join().unwrap();
        assert_eq!(fs::metadata(&dest).unwrap().len(), expected_len);
    }

    #[test]
    fn tessdata_destination_uses_language_layout() {
        let root = scratch_dir();
        let store = AssetStore::new(&root);
        let descriptor = AssetDescriptor {
            id: "ara".into(),
            display_name: "Arabic".into(),
            source_url: "https://example.com/tessdata/ara.traineddata".into(),
            sha256: String::new(),
            size_bytes: 0,
            kind: AssetKind::TessData,
        };
        let dest = store.destination_for(&descriptor).unwrap();
        assert_eq!(dest, root.join("tessdata").join("ara.traineddata"));
        assert_eq!(dest, store.tessdata_path("ara"));
    }
}
