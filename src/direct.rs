//! Direct management of `/etc/resolv.conf`.
//!
//! The manager overwrites the resolver file and keeps the previous contents
//! in a sibling backup file until DNS management is released. Whether a
//! takeover is in progress is never cached: it is re-derived from the
//! filesystem on every call, so a restarted daemon picks up where the
//! previous process left off.

use crate::config::DnsConfig;
use crate::error::{Error, Result};
use crate::fs::{DirectFs, WholeFileFs};
use crate::resolv_conf::{HEADER, is_managed, parse, render};
use crate::util::describe_fs_error;
use std::io;
use std::path::{Path, PathBuf};

/// Default resolver configuration file.
pub const DEFAULT_TARGET_PATH: &str = "/etc/resolv.conf";

/// Default location of the pre-takeover backup.
pub const DEFAULT_BACKUP_PATH: &str = "/etc/resolv.pre-takeover-backup.conf";

/// Permission bits for files the manager creates.
const DEFAULT_MODE: u32 = 0o644;

/// Takes over the resolver file and restores it on release.
///
/// # Lifecycle
///
/// 1. The first non-empty [`set_dns`](Self::set_dns) moves the current file
///    to the backup path and writes the rendered config.
/// 2. Further `set_dns` calls only rewrite the target.
/// 3. An empty `set_dns` or [`close`](Self::close) moves the backup back. If
///    there was no file to back up, the generated file is removed instead.
///
/// # Degraded filesystems
///
/// Containers often bind-mount `/etc/resolv.conf`, which makes renaming it
/// fail and removing it fail with `EBUSY`. Each rename therefore falls back
/// to copying the contents, and removals that only tidy up are allowed to
/// fail.
///
/// # Example
///
/// ```rust,ignore
/// use resolvconf_takeover::{DirectManager, DnsConfig};
///
/// let manager = DirectManager::host();
/// manager.set_dns(&DnsConfig::new().with_nameserver("100.100.100.100".parse()?))?;
/// // ...
/// manager.close()?;
/// ```
#[derive(Debug)]
pub struct DirectManager<F> {
    fs: F,
    target: PathBuf,
    backup: PathBuf,
    mode: u32,
}

impl DirectManager<DirectFs> {
    /// Manages the host's `/etc/resolv.conf`.
    #[must_use]
    pub fn host() -> Self {
        Self::new(DirectFs::new())
    }
}

impl Default for DirectManager<DirectFs> {
    fn default() -> Self {
        Self::host()
    }
}

impl<F: WholeFileFs> DirectManager<F> {
    /// Creates a manager using the default paths on `fs`.
    #[must_use]
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            target: PathBuf::from(DEFAULT_TARGET_PATH),
            backup: PathBuf::from(DEFAULT_BACKUP_PATH),
            mode: DEFAULT_MODE,
        }
    }

    /// Overrides the resolver file path.
    #[must_use]
    pub fn with_target_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target = path.into();
        self
    }

    /// Overrides the backup path. It should live on the same mount as the
    /// target so the atomic rename path can be used.
    #[must_use]
    pub fn with_backup_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup = path.into();
        self
    }

    /// Overrides the permission bits used when creating files.
    #[must_use]
    pub const fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the resolver file path.
    #[must_use]
    pub fn target_path(&self) -> &Path {
        &self.target
    }

    /// Returns the backup path.
    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// resolv.conf cannot route queries per domain.
    #[must_use]
    pub const fn supports_split_dns(&self) -> bool {
        false
    }

    /// Applies `config`, or releases the resolver file if `config` is empty.
    ///
    /// The pre-takeover file is backed up once per takeover. Failing to back
    /// it up does not stop the new settings from being written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the current file cannot be read for backup,
    /// if the rendered config cannot be written, or if releasing fails (see
    /// [`close`](Self::close)).
    pub fn set_dns(&self, config: &DnsConfig) -> Result<()> {
        if config.is_empty() {
            return self.restore_or_remove();
        }

        if self.needs_backup() {
            self.create_backup()?;
        }

        self.fs
            .write_file(&self.target, render(config).as_bytes(), self.mode)
            .map_err(|e| Error::io("write", &self.target, e))?;

        tracing::info!(
            path = %self.target.display(),
            nameservers = config.nameservers.len(),
            search_domains = config.search_domains.len(),
            "Wrote resolver configuration"
        );
        if !config.match_domains.is_empty() {
            tracing::debug!(
                match_domains = config.match_domains.len(),
                "Match domains cannot be expressed in resolv.conf, ignoring"
            );
        }
        Ok(())
    }

    /// Restores the pre-takeover resolver file.
    ///
    /// A no-op if no takeover is in progress. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the backup exists but can neither be renamed
    /// nor copied back over the target.
    pub fn close(&self) -> Result<()> {
        self.restore_or_remove()
    }

    /// Returns the configuration the OS would use without this manager.
    ///
    /// Reads the backup during a takeover and the live file otherwise
    /// (including when the backup is only a stale marker). A missing file
    /// yields an empty config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on read failure and [`Error::Parse`] if the file
    /// is not valid resolv.conf.
    pub fn base_config(&self) -> Result<DnsConfig> {
        let path = if self.exists(&self.backup)? && !self.backup_is_stale() {
            &self.backup
        } else {
            &self.target
        };

        match self.fs.read_file(path) {
            Ok(bytes) => parse(&String::from_utf8_lossy(&bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(DnsConfig::new()),
            Err(e) => Err(Error::io("read", path, e)),
        }
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        match self.fs.stat(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io("stat", path, e)),
        }
    }

    /// Decides whether the target must be snapshotted before overwriting it.
    ///
    /// An existing backup is never replaced during a takeover, even if a
    /// third party rewrites the target meanwhile. The one exception is a
    /// backup holding generated content: backups are only ever made of the
    /// pre-takeover file, so such a backup is the marker a restore leaves
    /// when it cannot delete the backup (see `restore_backup`).
    fn needs_backup(&self) -> bool {
        match self.fs.stat(&self.backup) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return true,
            Err(e) => {
                // Snapshotting over a backup that may exist would destroy the
                // original, so assume one does and go on with the takeover.
                tracing::warn!(
                    backup = %self.backup.display(),
                    error = %e,
                    reason = describe_fs_error(&e),
                    "Cannot check for resolver backup, not creating one"
                );
                return false;
            }
        }

        if self.backup_is_stale() {
            tracing::info!(
                backup = %self.backup.display(),
                "Replacing stale resolver backup left by an earlier restore"
            );
            return true;
        }
        false
    }

    /// Returns `true` if the backup holds generated content.
    ///
    /// An unreadable backup is assumed to be the original.
    fn backup_is_stale(&self) -> bool {
        self.fs
            .read_file(&self.backup)
            .is_ok_and(|bytes| is_managed(&String::from_utf8_lossy(&bytes)))
    }

    /// Moves the target to the backup path, copying if rename is refused.
    ///
    /// The rename is atomic; the copy is not, and leaves a window in which
    /// the backup is partially written.
    fn create_backup(&self) -> Result<()> {
        let rename_err = match self.fs.rename(&self.target, &self.backup) {
            Ok(()) => {
                tracing::info!(
                    backup = %self.backup.display(),
                    "Backed up resolver configuration"
                );
                return Ok(());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => e,
        };

        tracing::debug!(
            path = %self.target.display(),
            error = %rename_err,
            reason = describe_fs_error(&rename_err),
            "Cannot rename resolver file, copying instead"
        );

        let contents = match self.fs.read_file(&self.target) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::io("read", &self.target, e)),
        };

        if let Err(e) = self.fs.write_file(&self.backup, &contents, self.mode) {
            // Applying the requested settings takes priority over being able
            // to undo them.
            tracing::warn!(
                backup = %self.backup.display(),
                error = %e,
                reason = describe_fs_error(&e),
                "Failed to write resolver backup, original will not be restorable"
            );
            // A truncated backup would later be restored as if it were the
            // original.
            if let Err(e) = self.fs.remove(&self.backup) {
                tracing::debug!(error = %e, "Failed to remove partial backup");
            }
            return Ok(());
        }

        // The target is truncated by the write that follows, so this remove
        // is cosmetic. Bind-mounted files refuse it with EBUSY.
        if let Err(e) = self.fs.remove(&self.target) {
            tracing::debug!(
                path = %self.target.display(),
                error = %e,
                reason = describe_fs_error(&e),
                "Failed to remove resolver file after copying it"
            );
        }

        tracing::info!(
            backup = %self.backup.display(),
            "Backed up resolver configuration by copy"
        );
        Ok(())
    }

    fn restore_or_remove(&self) -> Result<()> {
        if !self.exists(&self.backup)? {
            self.remove_managed_target();
            return Ok(());
        }

        if self.backup_is_stale() {
            // Nothing to restore from a marker; the target was already
            // restored by the restore that left it.
            if let Err(e) = self.fs.remove(&self.backup) {
                tracing::debug!(
                    backup = %self.backup.display(),
                    error = %e,
                    "Failed to remove stale resolver backup"
                );
            }
            self.remove_managed_target();
            return Ok(());
        }

        self.restore_backup()
    }

    /// Moves the backup back over the target, copying if rename is refused.
    fn restore_backup(&self) -> Result<()> {
        let rename_err = match self.fs.rename(&self.backup, &self.target) {
            Ok(()) => {
                tracing::info!(
                    path = %self.target.display(),
                    "Restored resolver configuration"
                );
                return Ok(());
            }
            Err(e) => e,
        };

        tracing::debug!(
            backup = %self.backup.display(),
            error = %rename_err,
            reason = describe_fs_error(&rename_err),
            "Cannot rename resolver backup, copying instead"
        );

        let contents = self
            .fs
            .read_file(&self.backup)
            .map_err(|e| Error::io("read", &self.backup, e))?;
        self.fs
            .write_file(&self.target, &contents, self.mode)
            .map_err(|e| Error::io("write", &self.target, e))?;

        // The target already holds the original. If the backup cannot be
        // removed, overwrite it with generated content so the next takeover
        // knows to replace it instead of keeping it as the original.
        if let Err(e) = self.fs.remove(&self.backup) {
            tracing::warn!(
                backup = %self.backup.display(),
                error = %e,
                reason = describe_fs_error(&e),
                "Failed to remove resolver backup after restoring it, marking it stale"
            );
            if let Err(e) = self.fs.write_file(&self.backup, HEADER.as_bytes(), self.mode) {
                tracing::warn!(
                    backup = %self.backup.display(),
                    error = %e,
                    "Failed to mark resolver backup stale"
                );
            }
        }

        tracing::info!(
            path = %self.target.display(),
            "Restored resolver configuration by copy"
        );
        Ok(())
    }

    /// Removes the target if it holds generated content.
    ///
    /// Without a backup there was no original file, so the generated one has
    /// to go. Foreign content is never touched. Every failure here is only
    /// logged: this runs on shutdown paths where a lingering file is
    /// preferable to an error nobody can act on.
    fn remove_managed_target(&self) {
        let contents = match self.fs.read_file(&self.target) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No resolver takeover in progress, nothing to restore");
                return;
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.target.display(),
                    error = %e,
                    "Cannot read resolver file, leaving it in place"
                );
                return;
            }
        };

        if !is_managed(&String::from_utf8_lossy(&contents)) {
            tracing::debug!(
                path = %self.target.display(),
                "Resolver file not managed by us, leaving it in place"
            );
            return;
        }

        match self.fs.remove(&self.target) {
            Ok(()) => tracing::info!(
                path = %self.target.display(),
                "Removed generated resolver configuration"
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.target.display(),
                error = %e,
                reason = describe_fs_error(&e),
                "Failed to remove generated resolver configuration"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Fqdn;

    const ORIG: &str = "nameserver 9.9.9.9 # orig\n";

    /// Fails the listed `(operation, path)` pairs with `EBUSY`.
    struct FaultyFs {
        inner: DirectFs,
        faults: Vec<(&'static str, &'static str)>,
    }

    impl FaultyFs {
        fn check(&self, op: &str, path: &Path) -> io::Result<()> {
            if self
                .faults
                .iter()
                .any(|&(o, p)| o == op && (p == "*" || Path::new(p) == path))
            {
                return Err(io::Error::from_raw_os_error(libc::EBUSY));
            }
            Ok(())
        }
    }

    impl WholeFileFs for FaultyFs {
        fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.check("read", path)?;
            self.inner.read_file(path)
        }

        fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
            self.check("write", path)?;
            self.inner.write_file(path, contents, mode)
        }

        fn stat(&self, path: &Path) -> io::Result<()> {
            self.check("stat", path)?;
            self.inner.stat(path)
        }

        fn remove(&self, path: &Path) -> io::Result<()> {
            self.check("remove", path)?;
            self.inner.remove(path)
        }

        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            self.check("rename", from)?;
            self.check("rename", to)?;
            self.inner.rename(from, to)
        }
    }

    fn sandbox() -> (tempfile::TempDir, DirectFs) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("etc")).unwrap();
        let fs = DirectFs::with_prefix(dir.path());
        (dir, fs)
    }

    fn faulty(fs: &DirectFs, faults: &[(&'static str, &'static str)]) -> FaultyFs {
        FaultyFs {
            inner: fs.clone(),
            faults: faults.to_vec(),
        }
    }

    fn config() -> DnsConfig {
        DnsConfig::new()
            .with_nameserver("100.100.100.100".parse().unwrap())
            .with_search_domain(Fqdn::new("example.ts.net").unwrap())
    }

    fn read(fs: &DirectFs, path: &str) -> Option<String> {
        fs.read_file(Path::new(path))
            .ok()
            .map(|b| String::from_utf8(b).unwrap())
    }

    fn write(fs: &DirectFs, path: &str, contents: &str) {
        fs.write_file(Path::new(path), contents.as_bytes(), 0o644).unwrap();
    }

    #[test]
    fn takeover_and_restore() {
        let (_dir, fs) = sandbox();
        write(&fs, DEFAULT_TARGET_PATH, ORIG);
        let m = DirectManager::new(&fs);

        m.set_dns(&config()).unwrap();
        let current = read(&fs, DEFAULT_TARGET_PATH).unwrap();
        assert!(current.starts_with(HEADER));
        assert!(current.contains("nameserver 100.100.100.100\n"));
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH).as_deref(), Some(ORIG));

        m.close().unwrap();
        assert_eq!(read(&fs, DEFAULT_TARGET_PATH).as_deref(), Some(ORIG));
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH), None);
    }

    #[test]
    fn repeated_set_dns_keeps_first_backup() {
        let (_dir, fs) = sandbox();
        write(&fs, DEFAULT_TARGET_PATH, ORIG);
        let m = DirectManager::new(&fs);

        m.set_dns(&config()).unwrap();
        let second = DnsConfig::new().with_nameserver("1.1.1.1".parse().unwrap());
        m.set_dns(&second).unwrap();

        assert!(read(&fs, DEFAULT_TARGET_PATH).unwrap().contains("nameserver 1.1.1.1\n"));
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH).as_deref(), Some(ORIG));
    }

    #[test]
    fn absent_target_is_created_then_removed() {
        let (_dir, fs) = sandbox();
        let m = DirectManager::new(&fs);

        m.set_dns(&config()).unwrap();
        assert!(read(&fs, DEFAULT_TARGET_PATH).is_some());
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH), None);

        m.set_dns(&config()).unwrap();
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH), None);

        m.close().unwrap();
        assert_eq!(read(&fs, DEFAULT_TARGET_PATH), None);
    }

    #[test]
    fn close_without_takeover_is_noop() {
        let (_dir, fs) = sandbox();
        write(&fs, DEFAULT_TARGET_PATH, ORIG);
        let m = DirectManager::new(&fs);

        m.close().unwrap();
        m.close().unwrap();
        assert_eq!(read(&fs, DEFAULT_TARGET_PATH).as_deref(), Some(ORIG));
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH), None);
    }

    #[test]
    fn close_with_nothing_on_disk_is_noop() {
        let (_dir, fs) = sandbox();
        DirectManager::new(&fs).close().unwrap();
        assert_eq!(read(&fs, DEFAULT_TARGET_PATH), None);
    }

    #[test]
    fn restart_resumes_takeover() {
        let (_dir, fs) = sandbox();
        write(&fs, DEFAULT_TARGET_PATH, ORIG);

        DirectManager::new(&fs).set_dns(&config()).unwrap();
        // A fresh instance has no memory of the first one.
        DirectManager::new(&fs).close().unwrap();

        assert_eq!(read(&fs, DEFAULT_TARGET_PATH).as_deref(), Some(ORIG));
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH), None);
    }

    #[test]
    fn stale_backup_is_replaced() {
        let (_dir, fs) = sandbox();
        // Marker left by a restore whose backup removal failed.
        write(&fs, DEFAULT_BACKUP_PATH, HEADER);
        write(&fs, DEFAULT_TARGET_PATH, ORIG);
        let m = DirectManager::new(&fs);

        m.set_dns(&config()).unwrap();
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH).as_deref(), Some(ORIG));

        m.close().unwrap();
        assert_eq!(read(&fs, DEFAULT_TARGET_PATH).as_deref(), Some(ORIG));
    }

    #[test]
    fn third_party_rewrite_does_not_replace_backup() {
        let (_dir, fs) = sandbox();
        write(&fs, DEFAULT_TARGET_PATH, ORIG);
        let m = DirectManager::new(&fs);

        m.set_dns(&config()).unwrap();
        // A DHCP client rewrites the file during the takeover.
        write(&fs, DEFAULT_TARGET_PATH, "nameserver 10.0.0.1\n");
        m.set_dns(&config()).unwrap();
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH).as_deref(), Some(ORIG));

        m.close().unwrap();
        assert_eq!(read(&fs, DEFAULT_TARGET_PATH).as_deref(), Some(ORIG));
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH), None);
    }

    #[test]
    fn foreign_backup_is_never_replaced() {
        let (_dir, fs) = sandbox();
        // A restart mid-takeover, after a third party rewrote the target.
        write(&fs, DEFAULT_BACKUP_PATH, ORIG);
        write(&fs, DEFAULT_TARGET_PATH, "nameserver 10.0.0.1\n");

        DirectManager::new(&fs).set_dns(&config()).unwrap();
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH).as_deref(), Some(ORIG));
    }

    #[test]
    fn backup_with_absent_target_is_kept() {
        let (_dir, fs) = sandbox();
        // Crash between backing up and writing the new file.
        write(&fs, DEFAULT_BACKUP_PATH, ORIG);
        let m = DirectManager::new(&fs);

        m.set_dns(&config()).unwrap();
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH).as_deref(), Some(ORIG));
        m.close().unwrap();
        assert_eq!(read(&fs, DEFAULT_TARGET_PATH).as_deref(), Some(ORIG));
    }

    #[test]
    fn leftover_generated_file_is_removed_on_close() {
        let (_dir, fs) = sandbox();
        write(&fs, DEFAULT_TARGET_PATH, &render(&config()));
        let m = DirectManager::new(&fs);

        m.set_dns(&config()).unwrap();
        m.close().unwrap();
        assert_eq!(read(&fs, DEFAULT_TARGET_PATH), None);
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH), None);
    }

    #[test]
    fn backup_write_failure_does_not_block_takeover() {
        let (_dir, fs) = sandbox();
        write(&fs, DEFAULT_TARGET_PATH, ORIG);
        let ffs = faulty(&fs, &[("rename", "*"), ("write", DEFAULT_BACKUP_PATH)]);
        let m = DirectManager::new(&ffs);

        m.set_dns(&config()).unwrap();
        assert!(read(&fs, DEFAULT_TARGET_PATH).unwrap().starts_with(HEADER));
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH), None);
    }

    #[test]
    fn unreadable_target_only_matters_to_copy_fallback() {
        let (_dir, fs) = sandbox();
        write(&fs, DEFAULT_TARGET_PATH, ORIG);
        let ffs = faulty(&fs, &[("read", DEFAULT_TARGET_PATH)]);
        DirectManager::new(&ffs).set_dns(&config()).unwrap();
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH).as_deref(), Some(ORIG));
    }

    #[test]
    fn unreadable_target_aborts_copy_fallback() {
        let (_dir, fs) = sandbox();
        write(&fs, DEFAULT_TARGET_PATH, ORIG);
        let ffs = faulty(&fs, &[("rename", "*"), ("read", DEFAULT_TARGET_PATH)]);
        let m = DirectManager::new(&ffs);

        let err = m.set_dns(&config()).unwrap_err();
        assert!(matches!(err, Error::Io { op: "read", .. }), "{err:?}");
        assert_eq!(read(&fs, DEFAULT_TARGET_PATH).as_deref(), Some(ORIG));
    }

    #[test]
    fn target_write_failure_is_reported() {
        let (_dir, fs) = sandbox();
        write(&fs, DEFAULT_TARGET_PATH, ORIG);
        let ffs = faulty(&fs, &[("write", DEFAULT_TARGET_PATH)]);
        let m = DirectManager::new(&ffs);

        let err = m.set_dns(&config()).unwrap_err();
        assert!(matches!(err, Error::Io { op: "write", .. }), "{err:?}");
        // The backup survives for the next attempt or a restore.
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH).as_deref(), Some(ORIG));
    }

    #[test]
    fn leftover_backup_after_failed_remove_is_harmless() {
        let (_dir, fs) = sandbox();
        write(&fs, DEFAULT_TARGET_PATH, ORIG);
        let ffs = faulty(&fs, &[("rename", "*"), ("remove", DEFAULT_BACKUP_PATH)]);
        let m = DirectManager::new(&ffs);

        m.set_dns(&config()).unwrap();
        m.close().unwrap();
        assert_eq!(read(&fs, DEFAULT_TARGET_PATH).as_deref(), Some(ORIG));
        // The backup could not be removed, so it is marked stale.
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH).as_deref(), Some(HEADER));

        // Closing again converges on the same state.
        m.close().unwrap();
        assert_eq!(read(&fs, DEFAULT_TARGET_PATH).as_deref(), Some(ORIG));
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH).as_deref(), Some(HEADER));

        // The host rewrites the file; the next takeover must back up the
        // new contents, not the leftover.
        write(&fs, DEFAULT_TARGET_PATH, "nameserver 203.0.113.7\n");
        m.set_dns(&config()).unwrap();
        assert_eq!(
            read(&fs, DEFAULT_BACKUP_PATH).as_deref(),
            Some("nameserver 203.0.113.7\n")
        );
    }

    #[test]
    fn unreadable_backup_fails_restore() {
        let (_dir, fs) = sandbox();
        write(&fs, DEFAULT_TARGET_PATH, ORIG);
        DirectManager::new(&fs).set_dns(&config()).unwrap();

        let ffs = faulty(&fs, &[("rename", "*"), ("read", DEFAULT_BACKUP_PATH)]);
        let err = DirectManager::new(&ffs).close().unwrap_err();
        assert!(matches!(err, Error::Io { op: "read", .. }), "{err:?}");
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH).as_deref(), Some(ORIG));
    }

    #[test]
    fn stat_failure_does_not_block_takeover() {
        let (_dir, fs) = sandbox();
        write(&fs, DEFAULT_TARGET_PATH, ORIG);
        let ffs = faulty(&fs, &[("stat", DEFAULT_BACKUP_PATH)]);

        DirectManager::new(&ffs).set_dns(&config()).unwrap();
        assert!(read(&fs, DEFAULT_TARGET_PATH).unwrap().starts_with(HEADER));
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH), None);
    }

    #[test]
    fn stale_marker_is_cleared_on_close() {
        let (_dir, fs) = sandbox();
        write(&fs, DEFAULT_BACKUP_PATH, HEADER);
        write(&fs, DEFAULT_TARGET_PATH, ORIG);

        DirectManager::new(&fs).close().unwrap();
        assert_eq!(read(&fs, DEFAULT_TARGET_PATH).as_deref(), Some(ORIG));
        assert_eq!(read(&fs, DEFAULT_BACKUP_PATH), None);
    }

    #[test]
    fn stat_failure_on_close_is_reported() {
        let (_dir, fs) = sandbox();
        let ffs = faulty(&fs, &[("stat", DEFAULT_BACKUP_PATH)]);
        let err = DirectManager::new(&ffs).close().unwrap_err();
        assert!(matches!(err, Error::Io { op: "stat", .. }), "{err:?}");
    }

    #[test]
    fn busy_generated_file_is_left_without_error() {
        let (_dir, fs) = sandbox();
        let ffs = faulty(&fs, &[("remove", DEFAULT_TARGET_PATH)]);
        let m = DirectManager::new(&ffs);

        m.set_dns(&config()).unwrap();
        m.close().unwrap();
        assert!(read(&fs, DEFAULT_TARGET_PATH).is_some());
    }

    #[test]
    fn base_config_prefers_backup() {
        let (_dir, fs) = sandbox();
        let m = DirectManager::new(&fs);
        assert_eq!(m.base_config().unwrap(), DnsConfig::new());

        write(&fs, DEFAULT_TARGET_PATH, "nameserver 9.9.9.9\nsearch corp.example\n");
        let want = DnsConfig::new()
            .with_nameserver("9.9.9.9".parse().unwrap())
            .with_search_domain(Fqdn::new("corp.example").unwrap());
        assert_eq!(m.base_config().unwrap(), want);

        m.set_dns(&config()).unwrap();
        assert_eq!(m.base_config().unwrap(), want);

        m.close().unwrap();
        write(&fs, DEFAULT_BACKUP_PATH, HEADER);
        assert_eq!(m.base_config().unwrap(), want);
    }

    #[test]
    fn custom_paths() {
        let (_dir, fs) = sandbox();
        write(&fs, "/etc/resolv.test", ORIG);
        let m = DirectManager::new(&fs)
            .with_target_path("/etc/resolv.test")
            .with_backup_path("/etc/resolv.test.bak")
            .with_mode(0o600);
        assert_eq!(m.target_path(), Path::new("/etc/resolv.test"));
        assert!(!m.supports_split_dns());

        m.set_dns(&config()).unwrap();
        assert_eq!(read(&fs, "/etc/resolv.test.bak").as_deref(), Some(ORIG));
        m.close().unwrap();
        assert_eq!(read(&fs, "/etc/resolv.test").as_deref(), Some(ORIG));
    }
}
