//! # Peer Endpoints
//!
//! An endpoint is announced as a single line of text:
//!
//! ```text
//! <API> [dns] [ipv4] [ipv6] <port>
//! BASIC_MERKLED_API 127.0.0.1 8999
//! BASIC_MERKLED_API node.example.org 192.168.1.10 ::1 443
//! ```
//!
//! Hosts are recognised by parsing: anything that is not an IPv4 or IPv6
//! address is taken as a DNS name.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DocumentError;

/// Protocol tag of the node's synchronization/read API.
pub const BASIC_MERKLED_API: &str = "BASIC_MERKLED_API";

/// A reachable address of a peer for one protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    /// Protocol tag (e.g. `BASIC_MERKLED_API`).
    pub api: String,
    pub dns: Option<String>,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
    pub port: u16,
}

impl Endpoint {
    /// Build a `BASIC_MERKLED_API` endpoint.
    #[must_use]
    pub fn basic_merkled(
        dns: Option<String>,
        ipv4: Option<Ipv4Addr>,
        ipv6: Option<Ipv6Addr>,
        port: u16,
    ) -> Self {
        Self {
            api: BASIC_MERKLED_API.to_string(),
            dns,
            ipv4,
            ipv6,
            port,
        }
    }

    /// Preferred host for contacting this endpoint: DNS, then IPv4, then IPv6.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        if let Some(dns) = &self.dns {
            return Some(dns.clone());
        }
        if let Some(ipv4) = self.ipv4 {
            return Some(ipv4.to_string());
        }
        self.ipv6.map(|ipv6| format!("[{ipv6}]"))
    }

    /// Base HTTP URL of this endpoint.
    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.host().map(|host| format!("http://{host}:{}", self.port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api)?;
        if let Some(dns) = &self.dns {
            write!(f, " {dns}")?;
        }
        if let Some(ipv4) = self.ipv4 {
            write!(f, " {ipv4}")?;
        }
        if let Some(ipv6) = self.ipv6 {
            write!(f, " {ipv6}")?;
        }
        write!(f, " {}", self.port)
    }
}

impl FromStr for Endpoint {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DocumentError::InvalidEndpoint(s.to_string());
        let tokens: Vec<&str> = s.split_whitespace().collect();

        // API tag, at least one host, port.
        let [api, hosts @ .., port] = tokens.as_slice() else {
            return Err(invalid());
        };
        if hosts.is_empty() {
            return Err(invalid());
        }
        let port: u16 = port.parse().map_err(|_| invalid())?;

        let mut endpoint = Endpoint {
            api: (*api).to_string(),
            dns: None,
            ipv4: None,
            ipv6: None,
            port,
        };
        for host in hosts {
            if let Ok(ipv4) = host.parse::<Ipv4Addr>() {
                endpoint.ipv4 = Some(ipv4);
            } else if let Ok(ipv6) = host.parse::<Ipv6Addr>() {
                endpoint.ipv6 = Some(ipv6);
            } else {
                endpoint.dns = Some((*host).to_string());
            }
        }
        Ok(endpoint)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = DocumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4_endpoint() {
        let ep: Endpoint = "BASIC_MERKLED_API 127.0.0.1 8999".parse().unwrap();
        assert_eq!(ep.api, BASIC_MERKLED_API);
        assert_eq!(ep.ipv4, Some(Ipv4Addr::LOCALHOST));
        assert_eq!(ep.port, 8999);
        assert_eq!(ep.url().as_deref(), Some("http://127.0.0.1:8999"));
    }

    #[test]
    fn test_parse_mixed_hosts() {
        let ep: Endpoint = "BASIC_MERKLED_API node.example.org 10.0.0.1 ::1 443"
            .parse()
            .unwrap();
        assert_eq!(ep.dns.as_deref(), Some("node.example.org"));
        assert_eq!(ep.ipv4, Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(ep.ipv6, Some(Ipv6Addr::LOCALHOST));
        assert_eq!(ep.host().as_deref(), Some("node.example.org"));
        assert_eq!(
            ep.to_string(),
            "BASIC_MERKLED_API node.example.org 10.0.0.1 ::1 443"
        );
    }

    #[test]
    fn test_ipv6_only_url_is_bracketed() {
        let ep: Endpoint = "BASIC_MERKLED_API ::1 80".parse().unwrap();
        assert_eq!(ep.url().as_deref(), Some("http://[::1]:80"));
    }

    #[test]
    fn test_reject_missing_host_or_port() {
        assert!("BASIC_MERKLED_API 8999".parse::<Endpoint>().is_err());
        assert!("BASIC_MERKLED_API 127.0.0.1 notaport".parse::<Endpoint>().is_err());
        assert!("".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let ep: Endpoint = serde_json::from_str("\"BASIC_MERKLED_API 127.0.0.1 80\"").unwrap();
        assert_eq!(
            serde_json::to_string(&ep).unwrap(),
            "\"BASIC_MERKLED_API 127.0.0.1 80\""
        );
    }
}
