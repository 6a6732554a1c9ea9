//! Internal utilities.

use std::io;

/// Explains the OS errors that typically block `/etc/resolv.conf` handling
/// inside containers, for log messages.
///
/// Docker and Kubernetes bind-mount the file, so renaming it fails with
/// `EXDEV` or `EBUSY` and removing it fails with `EBUSY`.
#[must_use]
pub fn describe_fs_error(err: &io::Error) -> &'static str {
    match err.raw_os_error() {
        Some(libc::EXDEV) => "cross-device link, the file is likely on a separate mount",
        Some(libc::EBUSY) => "resource busy, the file is likely bind-mounted",
        Some(libc::EPERM | libc::EACCES) => "permission denied",
        Some(libc::EROFS) => "read-only filesystem",
        _ => "unexpected error",
    }
}
