// src/fs/mod.rs

use std::borrow::Cow;
use std::fmt::Debug;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
///
/// Staleness, cleaning and coverage checks only touch the disk through this
/// trait, so they can run against [`mock::MockFileSystem`] in tests.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;

    /// Modification time, or `None` if nothing exists at `path`.
    fn modified(&self, path: &Path) -> Result<Option<SystemTime>>;

    /// Remove a file. Returns `false` if it did not exist.
    fn remove_file(&self, path: &Path) -> Result<bool>;
}

/// Implementation that uses `std::fs`.
///
/// Relative paths are resolved against `root` when one is set (the
/// directory holding the config file), otherwise against the process
/// working directory.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem {
    root: Option<PathBuf>,
}

impl RealFileSystem {
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match &self.root {
            Some(root) if path.is_relative() => Cow::Owned(root.join(path)),
            _ => Cow::Borrowed(path),
        }
    }
}

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let path = self.resolve(path);
        fs::read_to_string(&path).with_context(|| format!("reading file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let path = self.resolve(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let mut file =
            fs::File::create(&path).with_context(|| format!("creating file {:?}", path))?;
        file.write_all(contents)
            .with_context(|| format!("writing to file {:?}", path))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn modified(&self, path: &Path) -> Result<Option<SystemTime>> {
        let path = self.resolve(path);
        match fs::metadata(&path) {
            Ok(meta) => {
                let mtime = meta
                    .modified()
                    .with_context(|| format!("reading mtime of {:?}", path))?;
                Ok(Some(mtime))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading metadata of {:?}", path)),
        }
    }

    fn remove_file(&self, path: &Path) -> Result<bool> {
        let path = self.resolve(path);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("removing file {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooted_fs_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let fs = RealFileSystem::rooted(dir.path());

        fs.write(Path::new("_data/a.txt"), b"x").unwrap();
        assert!(dir.path().join("_data/a.txt").is_file());
        assert!(fs.exists(Path::new("_data/a.txt")));
        assert!(fs.modified(Path::new("_data/a.txt")).unwrap().is_some());

        assert!(fs.remove_file(Path::new("_data/a.txt")).unwrap());
        assert!(!fs.remove_file(Path::new("_data/a.txt")).unwrap());
        assert_eq!(fs.modified(Path::new("_data/a.txt")).unwrap(), None);
    }
}
