use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::{ResultStore, StoreError, StoredResult};

/// Filesystem-based result store.
///
/// Each result is stored at `{base_path}/{id[0..2]}/{id}.json`. Parent
/// directories are created automatically.
#[derive(Debug, Clone)]
pub struct FsResultStore {
  base_path: PathBuf,
}

impl FsResultStore {
  /// Create a new filesystem store with the given base path.
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  pub fn base_path(&self) -> &PathBuf {
    &self.base_path
  }

  fn id_to_path(&self, id: &str) -> Result<PathBuf, StoreError> {
    if id.len() < 2 || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
      return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(self.base_path.join(&id[..2]).join(format!("{}.json", id)))
  }
}

/// A sibling of `path` private to one write, so concurrent writers of the
/// same id never share a temporary file.
fn partial_path(path: &Path) -> PathBuf {
  let mut name = path.file_name().map(OsString::from).unwrap_or_default();
  name.push(format!(".{}.partial", Uuid::new_v4().simple()));
  path.with_file_name(name)
}

#[async_trait]
impl ResultStore for FsResultStore {
  async fn get_result(&self, id: &str) -> Result<Option<StoredResult>, StoreError> {
    let path = self.id_to_path(id)?;
    let bytes = match fs::read(&path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(StoreError::Io(e)),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
  }

  async fn set_result(&self, id: &str, result: StoredResult) -> Result<(), StoreError> {
    let path = self.id_to_path(id)?;

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).await?;
    }

    let bytes = serde_json::to_vec(&result)?;
    // Written to a sibling file and renamed so readers never see a partial entry.
    let partial = partial_path(&path);
    let mut file = fs::File::create(&partial).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    drop(file);
    if let Err(e) = fs::rename(&partial, &path).await {
      let _ = fs::remove_file(&partial).await;
      return Err(StoreError::Io(e));
    }
    Ok(())
  }

  async fn remove_result(&self, id: &str) -> Result<(), StoreError> {
    let path = self.id_to_path(id)?;
    match fs::remove_file(&path).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(StoreError::Io(e)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_id_to_path_shards_by_prefix() {
    let store = FsResultStore::new("/cache");
    assert_eq!(
      store.id_to_path("ab12").unwrap(),
      PathBuf::from("/cache/ab/ab12.json")
    );
  }

  #[test]
  fn test_partial_paths_are_unique_siblings() {
    let path = PathBuf::from("/cache/ab/ab12.json");
    let first = partial_path(&path);
    let second = partial_path(&path);

    assert_ne!(first, second);
    assert_eq!(first.parent(), path.parent());
    let name = first.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("ab12.json."));
    assert!(name.ends_with(".partial"));
  }

  #[test]
  fn test_id_to_path_rejects_traversal() {
    let store = FsResultStore::new("/cache");
    assert!(matches!(store.id_to_path("../etc"), Err(StoreError::InvalidId(_))));
    assert!(matches!(store.id_to_path("a"), Err(StoreError::InvalidId(_))));
  }
}
