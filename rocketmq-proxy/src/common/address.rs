// Copyright 2023 The RocketMQ Rust Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::ProxyError;

/// A broker or client endpoint, `host:port`. IPv6 hosts are bracketed when
/// rendered, `[::1]:10911`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostAndPort {
    host: String,
    port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostScheme {
    Ipv4,
    Ipv6,
    DomainName,
}

impl HostAndPort {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        HostAndPort {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn scheme(&self) -> HostScheme {
        match IpAddr::from_str(&self.host) {
            Ok(IpAddr::V4(_)) => HostScheme::Ipv4,
            Ok(IpAddr::V6(_)) => HostScheme::Ipv6,
            Err(_) => HostScheme::DomainName,
        }
    }
}

impl FromStr for HostAndPort {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ProxyError::ClientInput(format!("malformed endpoint: {s}"));

        if let Some(rest) = s.strip_prefix('[') {
            // bracketed IPv6
            let (host, port) = rest.split_once("]:").ok_or_else(malformed)?;
            let port = port.parse::<u16>().map_err(|_| malformed())?;
            if host.is_empty() {
                return Err(malformed());
            }
            return Ok(HostAndPort::new(host, port));
        }

        let (host, port) = s.rsplit_once(':').ok_or_else(malformed)?;
        if host.is_empty() || host.contains(':') {
            return Err(malformed());
        }
        let port = port.parse::<u16>().map_err(|_| malformed())?;
        Ok(HostAndPort::new(host, port))
    }
}

impl fmt::Display for HostAndPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scheme() == HostScheme::Ipv6 {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ipv4_endpoint() {
        let endpoint = "127.0.0.1:10911".parse::<HostAndPort>().unwrap();
        assert_eq!(endpoint.host(), "127.0.0.1");
        assert_eq!(endpoint.port(), 10911);
        assert_eq!(endpoint.scheme(), HostScheme::Ipv4);
        assert_eq!(endpoint.to_string(), "127.0.0.1:10911");
    }

    #[test]
    fn parse_domain_endpoint() {
        let endpoint = "broker-a.rocketmq.svc:10911".parse::<HostAndPort>().unwrap();
        assert_eq!(endpoint.scheme(), HostScheme::DomainName);
    }

    #[test]
    fn parse_bracketed_ipv6_endpoint() {
        let endpoint = "[::1]:10911".parse::<HostAndPort>().unwrap();
        assert_eq!(endpoint.host(), "::1");
        assert_eq!(endpoint.scheme(), HostScheme::Ipv6);
        assert_eq!(endpoint.to_string(), "[::1]:10911");
    }

    #[test]
    fn reject_malformed_endpoints() {
        assert!("".parse::<HostAndPort>().is_err());
        assert!("localhost".parse::<HostAndPort>().is_err());
        assert!(":80".parse::<HostAndPort>().is_err());
        assert!("host:notaport".parse::<HostAndPort>().is_err());
        assert!("::1:10911".parse::<HostAndPort>().is_err());
    }
}
