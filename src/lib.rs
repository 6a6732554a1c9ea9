//! # resolvconf-takeover
//!
//! Take over `/etc/resolv.conf` on behalf of a network daemon and put the
//! original back when done.
//!
//! [`DirectManager`] writes the daemon's DNS settings straight into the
//! resolver file after moving the previous contents aside, and restores them
//! on release. It keeps no state of its own: whether a takeover is in
//! progress is read back from the filesystem, so a restarted daemon can
//! still restore the original.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use resolvconf_takeover::{DirectManager, DnsConfig};
//!
//! let manager = DirectManager::host();
//!
//! // Take over (requires root).
//! let config = DnsConfig::new()
//!     .with_nameserver("100.100.100.100".parse()?)
//!     .with_search_domain("example.ts.net".parse()?);
//! manager.set_dns(&config)?;
//!
//! // Release on shutdown. An empty config does the same.
//! manager.close()?;
//! ```
//!
//! ## Containers
//!
//! Docker and Kubernetes bind-mount `/etc/resolv.conf`, so it can be neither
//! renamed nor removed. The manager falls back to copying file contents and
//! tolerates failed removals, ending in the same state as on a regular
//! filesystem.
//!
//! ## Testing
//!
//! All file access goes through [`WholeFileFs`]. [`DirectFs::with_prefix`]
//! roots it in a temporary directory, and wrappers can inject failures.
//!
//! ## Permissions
//!
//! Writing to `/etc` requires root. The caller is responsible for privilege
//! elevation.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod direct;
pub mod error;
pub mod fs;
pub mod resolv_conf;
pub mod util;

pub use config::{DnsConfig, Fqdn};
pub use direct::{DEFAULT_BACKUP_PATH, DEFAULT_TARGET_PATH, DirectManager};
pub use error::{Error, Result};
pub use fs::{DirectFs, WholeFileFs};
