//! Mirror role determination
//!
//! A session is admin when its address matches one of the allow-lists:
//! - hostname alone against `admin_hostnames`
//! - `host:port` against `admin_hosts`
//!
//! Anything that does not parse as a host is a viewer.

use crate::config::MirrorConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Write direction granted to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorRole {
    /// Pushes local changes and seeds the container; also pulls
    Admin,
    /// Pulls only
    #[default]
    Viewer,
}

impl MirrorRole {
    /// Derive the role from a session address such as `localhost:5173` or
    /// `https://pos.example.com/orders`
    #[must_use]
    pub fn from_host(address: &str, config: &MirrorConfig) -> Self {
        let Some(authority) = Authority::parse(address) else {
            tracing::debug!(address, "unrecognized session address, using viewer role");
            return Self::Viewer;
        };

        let by_hostname = config
            .admin_hostnames
            .iter()
            .any(|h| h.eq_ignore_ascii_case(&authority.hostname));
        let by_host = config
            .admin_hosts
            .iter()
            .any(|h| h.eq_ignore_ascii_case(&authority.host));

        if by_hostname || by_host {
            Self::Admin
        } else {
            Self::Viewer
        }
    }

    /// Check if this role pushes local changes
    #[inline]
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for MirrorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Viewer => f.write_str("viewer"),
        }
    }
}

/// Host part of a session address
#[derive(Debug, Clone, PartialEq, Eq)]
struct Authority {
    /// Hostname without port
    hostname: String,
    /// Hostname with port when one was given
    host: String,
}

impl Authority {
    fn parse(address: &str) -> Option<Self> {
        let address = address.trim();
        let rest = match address.split_once("://") {
            Some((scheme, rest)) if !scheme.is_empty() => rest,
            Some(_) => return None,
            None => address,
        };
        let authority = rest.split(['/', '?', '#']).next()?;
        let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
        if host.is_empty() {
            return None;
        }

        let (hostname, port) = if let Some(inner) = host.strip_prefix('[') {
            let (ip, after) = inner.split_once(']')?;
            let port = match after {
                "" => None,
                p => Some(p.strip_prefix(':')?),
            };
            (ip, port)
        } else {
            match host.split_once(':') {
                Some((name, port)) => (name, Some(port)),
                None => (host, None),
            }
        };

        if hostname.is_empty() || !hostname.chars().all(is_host_char) {
            return None;
        }
        if let Some(port) = port {
            port.parse::<u16>().ok()?;
        }

        Some(Self {
            hostname: hostname.to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
        })
    }
}

fn is_host_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | ':')
}
