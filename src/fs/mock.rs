use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
struct MockFile {
    content: Vec<u8>,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, MockFile>,
    /// Logical clock, in seconds since the epoch. Every write advances it so
    /// later writes are strictly newer.
    clock: u64,
}

/// In-memory filesystem with deterministic modification times.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("mock filesystem lock poisoned"))
    }

    /// Create or overwrite a file, stamping it with the next clock tick.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        if let Ok(mut state) = self.lock() {
            state.clock += 1;
            let modified = UNIX_EPOCH + Duration::from_secs(state.clock);
            state.files.insert(
                path.as_ref().to_path_buf(),
                MockFile {
                    content: content.into(),
                    modified,
                },
            );
        }
    }

    /// Bump a file's modification time (creating it empty if missing).
    pub fn touch(&self, path: impl AsRef<Path>) {
        let content = self
            .lock()
            .ok()
            .and_then(|s| s.files.get(path.as_ref()).map(|f| f.content.clone()))
            .unwrap_or_default();
        self.add_file(path, content);
    }

    /// Force a specific modification time.
    pub fn set_modified(&self, path: impl AsRef<Path>, modified: SystemTime) {
        if let Ok(mut state) = self.lock() {
            if let Some(file) = state.files.get_mut(path.as_ref()) {
                file.modified = modified;
            }
        }
    }

    /// All file paths currently present, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .lock()
            .map(|s| s.files.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let state = self.lock()?;
        match state.files.get(path) {
            Some(file) => String::from_utf8(file.content.clone())
                .map_err(|e| anyhow!("Invalid UTF-8: {}", e)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock()
            .map(|s| s.files.contains_key(path))
            .unwrap_or(false)
    }

    fn modified(&self, path: &Path) -> Result<Option<SystemTime>> {
        let state = self.lock()?;
        Ok(state.files.get(path).map(|f| f.modified))
    }

    fn remove_file(&self, path: &Path) -> Result<bool> {
        let mut state = self.lock()?;
        Ok(state.files.remove(path).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_writes_are_strictly_newer() {
        let fs = MockFileSystem::new();
        fs.add_file("a", "1");
        fs.add_file("b", "2");

        let a = fs.modified(Path::new("a")).unwrap().unwrap();
        let b = fs.modified(Path::new("b")).unwrap().unwrap();
        assert!(b > a);

        fs.touch("a");
        let a2 = fs.modified(Path::new("a")).unwrap().unwrap();
        assert!(a2 > b);
        assert_eq!(fs.read_to_string(Path::new("a")).unwrap(), "1");
    }
}
