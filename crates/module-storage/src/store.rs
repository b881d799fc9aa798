//! Byte-addressable resource storage.
//!
//! The coordinator consumes storage through the [`ResourceStore`] trait;
//! implementations back onto local disk or a cloud object store. This
//! crate ships the local-disk implementation, which doubles as the
//! read-through cache backend and the test double.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Synchronous byte-addressable storage over `/`-separated relative paths.
///
/// All operations are blocking request/response calls; retry, timeout,
/// and cancellation behavior belong to the underlying store client.
pub trait ResourceStore {
    /// A stable, filesystem-safe identifier for this store, used to key
    /// local caches.
    fn identity(&self) -> String;

    /// Returns true if a resource exists at `path`.
    fn exists(&self, path: &str) -> io::Result<bool>;

    /// Resolves the resource at `path` to a local file and returns its
    /// path. Remote implementations download to a local handle; the
    /// local-disk implementation returns the backing file directly.
    fn read_file(&self, path: &str) -> io::Result<PathBuf>;

    /// Stores the content of the local file `source` at `path`,
    /// overwriting any existing resource.
    fn write(&self, path: &str, source: &Path) -> io::Result<()>;

    /// Removes the resource at `path`.
    fn delete(&self, path: &str) -> io::Result<()>;

    /// Copies the resource at `from` to `to` within this store.
    fn copy(&self, from: &str, to: &str) -> io::Result<()>;

    /// Lists the relative paths of all resources under `prefix` whose
    /// filename ends with `suffix`. A prefix with no resources lists
    /// empty rather than failing.
    fn list_filenames(&self, prefix: &str, suffix: &str) -> io::Result<Vec<String>>;
}

/// [`ResourceStore`] implementation rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    root: PathBuf,
}

impl LocalDiskStore {
    /// Creates a store rooted at `root`. The directory is created lazily
    /// on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn ensure_parent(&self, resolved: &Path) -> io::Result<()> {
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl ResourceStore for LocalDiskStore {
    fn identity(&self) -> String {
        let display = self.root.display().to_string();
        let sanitized: String = display
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect();
        sanitized.trim_matches('_').to_string()
    }

    fn exists(&self, path: &str) -> io::Result<bool> {
        Ok(self.resolve(path).is_file())
    }

    fn read_file(&self, path: &str) -> io::Result<PathBuf> {
        let resolved = self.resolve(path);
        if !resolved.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no resource at {path}"),
            ));
        }
        Ok(resolved)
    }

    fn write(&self, path: &str, source: &Path) -> io::Result<()> {
        let resolved = self.resolve(path);
        self.ensure_parent(&resolved)?;
        fs::copy(source, &resolved)?;
        Ok(())
    }

    fn delete(&self, path: &str) -> io::Result<()> {
        fs::remove_file(self.resolve(path))
    }

    fn copy(&self, from: &str, to: &str) -> io::Result<()> {
        let resolved_to = self.resolve(to);
        self.ensure_parent(&resolved_to)?;
        fs::copy(self.resolve(from), &resolved_to)?;
        Ok(())
    }

    fn list_filenames(&self, prefix: &str, suffix: &str) -> io::Result<Vec<String>> {
        let start = self.resolve(prefix);
        if !start.is_dir() {
            return Ok(Vec::new());
        }

        let base = prefix.trim_end_matches('/');
        let mut filenames = Vec::new();
        collect_files(&start, base, suffix, &mut filenames)?;
        filenames.sort();
        Ok(filenames)
    }
}

fn collect_files(dir: &Path, base: &str, suffix: &str, out: &mut Vec<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        let relative = if base.is_empty() {
            name.clone()
        } else {
            format!("{base}/{name}")
        };

        if entry.file_type()?.is_dir() {
            collect_files(&entry.path(), &relative, suffix, out)?;
        } else if name.ends_with(suffix) {
            out.push(relative);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store_with_temp() -> (tempfile::TempDir, LocalDiskStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDiskStore::new(dir.path());
        (dir, store)
    }

    fn local_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_write_read_exists_delete() {
        let (dir, store) = store_with_temp();
        let source = local_file(dir.path(), "source.zip", b"package bytes");

        assert!(!store.exists("dev/pkg/source.zip").unwrap());
        store.write("dev/pkg/source.zip", &source).unwrap();
        assert!(store.exists("dev/pkg/source.zip").unwrap());

        let resolved = store.read_file("dev/pkg/source.zip").unwrap();
        assert_eq!(fs::read(resolved).unwrap(), b"package bytes");

        store.delete("dev/pkg/source.zip").unwrap();
        assert!(!store.exists("dev/pkg/source.zip").unwrap());
        assert!(store.read_file("dev/pkg/source.zip").is_err());
    }

    #[test]
    fn test_copy_creates_parent_directories() {
        let (dir, store) = store_with_temp();
        let source = local_file(dir.path(), "a.txt", b"content");
        store.write("dev/a.txt", &source).unwrap();

        store
            .copy("dev/a.txt", "dev/archive/1700000000/a.txt")
            .unwrap();

        assert!(store.exists("dev/a.txt").unwrap());
        assert!(store.exists("dev/archive/1700000000/a.txt").unwrap());
    }

    #[test]
    fn test_list_filenames_recursive_with_suffix() {
        let (dir, store) = store_with_temp();
        let source = local_file(dir.path(), "x", b"x");
        store.write("dev/CS_1/20240101/pkg.zip", &source).unwrap();
        store
            .write("dev/CS_1/20240101/metadata.json", &source)
            .unwrap();
        store.write("dev/CS_2/20240201/other.zip", &source).unwrap();
        store.write("prod/CS_3/20240301/far.zip", &source).unwrap();

        let zips = store.list_filenames("dev", ".zip").unwrap();
        assert_eq!(
            zips,
            vec![
                "dev/CS_1/20240101/pkg.zip".to_string(),
                "dev/CS_2/20240201/other.zip".to_string(),
            ]
        );
    }

    #[test]
    fn test_list_filenames_missing_prefix_is_empty() {
        let (_dir, store) = store_with_temp();
        assert!(store.list_filenames("uat", ".zip").unwrap().is_empty());
    }

    #[test]
    fn test_identity_is_filesystem_safe() {
        let store = LocalDiskStore::new("/var/data/releases");
        let identity = store.identity();
        assert!(!identity.contains('/'));
        assert!(!identity.is_empty());
    }
}
