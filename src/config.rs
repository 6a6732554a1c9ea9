//! DNS configuration values.

use crate::error::{Error, Result};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A fully-qualified domain name in canonical form (always ends with `.`).
///
/// Only the shape matters here: the name must be non-empty, free of
/// whitespace and `#`, and have no empty labels.
///
/// ```
/// use resolvconf_takeover::Fqdn;
///
/// let name: Fqdn = "ts.net".parse().unwrap();
/// assert_eq!(name.as_str(), "ts.net.");
/// assert_eq!(name.without_trailing_dot(), "ts.net");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fqdn(String);

impl Fqdn {
    /// Validates `name` and appends the trailing dot if it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDomain`] if the name is empty, contains
    /// whitespace or `#`, or has an empty label.
    pub fn new(name: &str) -> Result<Self> {
        let bare = name.strip_suffix('.').unwrap_or(name);
        let valid = !bare.is_empty()
            && !bare.chars().any(|c| c.is_whitespace() || c == '#')
            && bare.split('.').all(|label| !label.is_empty());
        if !valid {
            return Err(Error::InvalidDomain(name.to_string()));
        }
        Ok(Self(format!("{bare}.")))
    }

    /// Canonical form, with the trailing dot.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display form used in resolv.conf, without the trailing dot.
    #[must_use]
    pub fn without_trailing_dot(&self) -> &str {
        self.0.strip_suffix('.').unwrap_or(&self.0)
    }
}

impl FromStr for Fqdn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for Fqdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The DNS settings a daemon wants the OS to use.
///
/// An empty value (see [`is_empty`](Self::is_empty)) means "stop managing
/// DNS". `match_domains` is accepted for compatibility with routing-capable
/// strategies but is never written: resolv.conf has no way to express it.
///
/// # Example
///
/// ```
/// use resolvconf_takeover::DnsConfig;
///
/// let config = DnsConfig::new()
///     .with_nameserver("8.8.8.8".parse().unwrap())
///     .with_search_domain("ts.net".parse().unwrap());
///
/// assert!(!config.is_empty());
/// assert_eq!(config.search_domains[0].as_str(), "ts.net.");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsConfig {
    /// Nameservers, in preference order.
    pub nameservers: Vec<IpAddr>,

    /// Search domains, in order, canonical form.
    pub search_domains: Vec<Fqdn>,

    /// Domains the caller would like routed to `nameservers`. Not persisted.
    pub match_domains: Vec<Fqdn>,
}

impl DnsConfig {
    /// Creates an empty config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a nameserver.
    #[must_use]
    pub fn with_nameserver(mut self, addr: IpAddr) -> Self {
        self.nameservers.push(addr);
        self
    }

    /// Appends a search domain.
    #[must_use]
    pub fn with_search_domain(mut self, domain: Fqdn) -> Self {
        self.search_domains.push(domain);
        self
    }

    /// Appends a match domain.
    #[must_use]
    pub fn with_match_domain(mut self, domain: Fqdn) -> Self {
        self.match_domains.push(domain);
        self
    }

    /// Returns `true` for the zero value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nameservers.is_empty() && self.search_domains.is_empty() && self.match_domains.is_empty()
    }
}
