//! Whole-file filesystem access.
//!
//! The manager only ever needs five primitives. Keeping them behind
//! [`WholeFileFs`] lets tests run inside a temporary directory and substitute
//! variants that refuse renames or removals, the way bind-mounted
//! `/etc/resolv.conf` files behave inside containers.

use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Filesystem primitives used by [`DirectManager`](crate::DirectManager).
///
/// Paths are absolute within the implementation's root. Implementations
/// must report missing files with [`io::ErrorKind::NotFound`].
pub trait WholeFileFs {
    /// Reads the entire file.
    ///
    /// # Errors
    ///
    /// Any I/O error, `NotFound` if the file does not exist.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Writes `contents`, creating the file with `mode` or truncating it.
    ///
    /// # Errors
    ///
    /// Any I/O error.
    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()>;

    /// Succeeds if the file exists.
    ///
    /// # Errors
    ///
    /// `NotFound` if the file does not exist, or any other I/O error.
    fn stat(&self, path: &Path) -> io::Result<()>;

    /// Removes the file.
    ///
    /// # Errors
    ///
    /// Any I/O error, including `NotFound`.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Renames `from` to `to`, replacing `to` if it exists.
    ///
    /// # Errors
    ///
    /// Any I/O error.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

impl<T: WholeFileFs + ?Sized> WholeFileFs for &T {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read_file(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
        (**self).write_file(path, contents, mode)
    }

    fn stat(&self, path: &Path) -> io::Result<()> {
        (**self).stat(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        (**self).remove(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        (**self).rename(from, to)
    }
}

impl<T: WholeFileFs + ?Sized> WholeFileFs for Box<T> {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read_file(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
        (**self).write_file(path, contents, mode)
    }

    fn stat(&self, path: &Path) -> io::Result<()> {
        (**self).stat(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        (**self).remove(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        (**self).rename(from, to)
    }
}

/// The real filesystem, optionally rooted under a prefix directory.
///
/// # Example
///
/// ```no_run
/// use resolvconf_takeover::DirectFs;
///
/// // Operates on the host's /etc/resolv.conf.
/// let host = DirectFs::new();
///
/// // Operates on <dir>/etc/resolv.conf.
/// let sandbox = DirectFs::with_prefix("/tmp/sandbox");
/// ```
#[derive(Debug, Clone)]
pub struct DirectFs {
    prefix: PathBuf,
}

impl DirectFs {
    /// Accesses paths as given, relative to `/`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prefix: PathBuf::from("/"),
        }
    }

    /// Resolves every path below `prefix` (useful for testing).
    #[must_use]
    pub fn with_prefix(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the root prefix.
    #[must_use]
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        // Joining an absolute path would discard the prefix.
        self.prefix.join(path.strip_prefix("/").unwrap_or(path))
    }
}

impl Default for DirectFs {
    fn default() -> Self {
        Self::new()
    }
}

impl WholeFileFs for DirectFs {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path))
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(self.resolve(path))?;
        file.write_all(contents)
    }

    fn stat(&self, path: &Path) -> io::Result<()> {
        std::fs::metadata(self.resolve(path)).map(|_| ())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(self.resolve(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(self.resolve(from), self.resolve(to))
    }
}
