//! Rendering and parsing of resolv.conf(5) text.
//!
//! Only `nameserver` and `search` are understood. Every other directive
//! (`options`, `domain`, `sortlist`, ...) is skipped so that files written by
//! other tools can still be read.

use crate::config::{DnsConfig, Fqdn};
use crate::error::{Error, Result};
use std::net::IpAddr;

/// Header written at the top of every generated file.
///
/// Other tools and users may match on this text, so it must stay stable.
pub const HEADER: &str = "\
# resolv.conf(5) file generated by resolvconf-takeover
# The original file is restored when DNS management is released
# DO NOT EDIT THIS FILE BY HAND -- CHANGES WILL BE OVERWRITTEN
";

/// Renders `config` as resolv.conf text.
///
/// ```text
/// # resolv.conf(5) file generated by resolvconf-takeover
/// # The original file is restored when DNS management is released
/// # DO NOT EDIT THIS FILE BY HAND -- CHANGES WILL BE OVERWRITTEN
///
/// nameserver 8.8.8.8
/// search ts.net ts-dns.test
/// ```
///
/// `match_domains` are dropped: resolv.conf cannot route per domain.
#[must_use]
pub fn render(config: &DnsConfig) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');

    for ns in &config.nameservers {
        out.push_str(&format!("nameserver {ns}\n"));
    }

    if !config.search_domains.is_empty() {
        let domains: Vec<&str> = config
            .search_domains
            .iter()
            .map(Fqdn::without_trailing_dot)
            .collect();
        out.push_str(&format!("search {}\n", domains.join(" ")));
    }

    out
}

/// Returns `true` if `contents` was produced by [`render`].
#[must_use]
pub fn is_managed(contents: &str) -> bool {
    HEADER
        .lines()
        .next()
        .is_some_and(|first| contents.starts_with(first))
}

/// Parses resolv.conf text into a [`DnsConfig`].
///
/// Comments start at the first `#` or `;` on a line. A directive keyword
/// must be followed by whitespace and a value; `nameserver1.1.1.1`,
/// `nameserver` and `nameserver #1.1.1.1` are all rejected. A zone suffix
/// (`fe80::1%eth0`) is dropped. Values are kept in file order.
///
/// # Errors
///
/// Returns [`Error::Parse`] for a malformed `nameserver` or `search` line.
pub fn parse(text: &str) -> Result<DnsConfig> {
    let mut config = DnsConfig::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(value) = directive(line, "nameserver", line_no)? {
            let token = value.split_whitespace().next().unwrap_or(value);
            // `IpAddr` has no zone; the link-local address alone is kept.
            let token = match token.split_once('%') {
                Some((addr, zone)) => {
                    tracing::debug!(addr, zone, "Dropping zone from nameserver address");
                    addr
                }
                None => token,
            };
            let addr: IpAddr = token.parse().map_err(|_| Error::Parse {
                line: line_no,
                reason: format!("invalid nameserver address {token:?}"),
            })?;
            config.nameservers.push(addr);
        } else if let Some(value) = directive(line, "search", line_no)? {
            for token in value.split_whitespace() {
                let domain = Fqdn::new(token).map_err(|_| Error::Parse {
                    line: line_no,
                    reason: format!("invalid search domain {token:?}"),
                })?;
                config.search_domains.push(domain);
            }
        }
    }

    Ok(config)
}

/// resolv.conf(5) accepts both `#` and `;` as comment markers.
fn strip_comment(line: &str) -> &str {
    line.find(['#', ';']).map_or(line, |i| &line[..i])
}

/// Matches `keyword` at the start of a trimmed, comment-free line.
///
/// Returns `Ok(None)` if the line is some other directive, and the value
/// (never empty) if the keyword is followed by whitespace.
fn directive<'a>(line: &'a str, keyword: &str, line_no: usize) -> Result<Option<&'a str>> {
    let Some(rest) = line.strip_prefix(keyword) else {
        return Ok(None);
    };
    if rest.starts_with(char::is_whitespace) {
        return Ok(Some(rest.trim_start()));
    }
    let reason = if rest.is_empty() {
        format!("missing value after {keyword:?}")
    } else {
        format!("missing space after {keyword:?}")
    };
    Err(Error::Parse {
        line: line_no,
        reason,
    })
}
