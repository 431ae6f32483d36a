use std::env;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_SUFFIX: AtomicUsize = AtomicUsize::new(0);

/// Test scratch directory named `<label>-<pid>-<n>` under the system temp
/// dir.  Concurrent test binaries and repeated labels within one binary each
/// get their own directory, and it is removed with its contents on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(label: &str) -> TempDir {
        let n = NEXT_SUFFIX.fetch_add(1, Ordering::Relaxed);
        let path = env::temp_dir().join(format!("{}-{}-{}", label, process::id(), n));
        if let Err(e) = fs::create_dir_all(&path) {
            panic!("cannot create scratch dir {}: {}", path.display(), e);
        }
        TempDir { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Deref for TempDir {
    type Target = PathBuf;

    fn deref(&self) -> &PathBuf {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_label_gets_distinct_dirs() {
        let first = TempDir::new("kviz-scratch");
        let second = TempDir::new("kviz-scratch");
        assert_ne!(first.path(), second.path());
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(&format!("kviz-scratch-{}-", process::id())));

        let kept = first.path().to_path_buf();
        fs::write(kept.join("f"), "x").unwrap();
        drop(first);
        assert!(!kept.exists());
        assert!(second.is_dir());
    }
}
