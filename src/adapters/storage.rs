use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.base_path
    }

    pub fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.full_path(path))?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // 先寫暫存檔再改名，避免留下寫了一半的快取
        let tmp_path = full_path.with_file_name(format!(
            ".{}.tmp",
            full_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ));
        if let Err(e) = fs::write(&tmp_path, data) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        fs::rename(&tmp_path, &full_path)?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        self.full_path(path).is_file()
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path);
        if full_path.is_dir() {
            fs::remove_dir_all(full_path)?;
        } else if full_path.exists() {
            fs::remove_file(full_path)?;
        }
        Ok(())
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        if !self.base_path.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // 忽略暫存檔
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write_file("nested/data.json", b"{}").await.unwrap();

        assert!(storage.exists("nested/data.json").await);
        assert_eq!(storage.read_file("nested/data.json").await.unwrap(), b"{}");
        assert!(!dir.path().join("nested/.data.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_list_and_remove() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.write_file("b.json", b"1").await.unwrap();
        storage.write_file("a.json", b"2").await.unwrap();
        std::fs::create_dir(dir.path().join("a_files")).unwrap();

        assert_eq!(
            storage.list_files().await.unwrap(),
            vec!["a.json", "a_files", "b.json"]
        );

        storage.remove_file("a.json").await.unwrap();
        storage.remove_file("a_files").await.unwrap();
        storage.remove_file("never_written").await.unwrap();
        assert_eq!(storage.list_files().await.unwrap(), vec!["b.json"]);
    }

    #[tokio::test]
    async fn test_list_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("absent"));
        assert!(storage.list_files().await.unwrap().is_empty());
    }
}
