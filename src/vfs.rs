use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem seam for the commit step. Rename denial surfaces as an
/// `io::Error` so callers can absorb it instead of unwinding.
pub trait Vfs: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
    fn rename_entry(&self, old: &Path, new: &Path) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl Vfs for RealFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_entries(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            entries.push(entry?.path());
        }
        entries.sort();
        Ok(entries)
    }

    fn rename_entry(&self, old: &Path, new: &Path) -> io::Result<()> {
        if new.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", new.display()),
            ));
        }
        fs::rename(old, new)
    }
}
