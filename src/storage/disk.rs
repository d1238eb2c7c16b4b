//! Directory-Backed File Store
//!
//! One file per record, named after the record's key. Used for a node's shard
//! and for a client's cache alike. There is no journal: each write is a single
//! file replacement and nothing spans two operations.

use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Opens (creating if needed) the store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub async fn read(&self, filename: &str) -> io::Result<Option<String>> {
        let path = self.path_for(filename)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replaces the stored content of `filename`. Last writer wins.
    pub async fn write(&self, filename: &str, content: &str) -> io::Result<()> {
        let path = self.path_for(filename)?;
        tokio::fs::write(&path, content).await
    }

    /// Removes `filename`, returning whether it was present.
    pub async fn remove(&self, filename: &str) -> io::Result<bool> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn contains(&self, filename: &str) -> io::Result<bool> {
        let path = self.path_for(filename)?;
        tokio::fs::try_exists(&path).await
    }

    fn path_for(&self, filename: &str) -> io::Result<PathBuf> {
        validate_filename(filename)?;
        Ok(self.root.join(filename))
    }
}

/// Filenames are flat keys: exactly one path component, no traversal.
pub fn validate_filename(filename: &str) -> io::Result<()> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0']);

    if invalid {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid filename {:?}", filename),
        ));
    }
    Ok(())
}
