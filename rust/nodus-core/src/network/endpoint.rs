// Endpoint - Adresse canonique d'un pair: scheme://host:port
//
// IPv6 hosts are written in brackets (`tcp://[::1]:10333`). A bare host containing
// `:` is rejected when parsing, so the final `:` always separates the port.

use crate::wire::FormatError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::LazyLock;

static ENDPOINT_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z]+)://(.*):(\d+)$").ok());

/// Only transport currently dialed by the network
pub const TCP: &str = "tcp";

/// Canonical peer address string
///
/// Equality and hashing use the raw string, so two spellings of the same socket
/// address are two endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint(String);

/// Decomposed endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointConfig {
    pub endpoint_type: String,
    pub host: String,
    pub port: u16,
}

impl EndpointConfig {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self {
            endpoint_type: TCP.to_string(),
            host: host.into(),
            port,
        }
    }
}

/// Format an endpoint; IPv6 hosts get brackets
///
/// Fails when the parts would not parse back to the same config: a scheme
/// with anything but letters, or a host carrying its own brackets.
pub fn create_endpoint(config: &EndpointConfig) -> Result<Endpoint, FormatError> {
    let value = format_endpoint(config);
    if parse_endpoint(&value)? != *config {
        return Err(FormatError::InvalidEndpoint(value));
    }
    Ok(Endpoint(value))
}

fn format_endpoint(config: &EndpointConfig) -> String {
    let host = if config.host.contains(':') {
        format!("[{}]", config.host)
    } else {
        config.host.clone()
    };
    format!("{}://{}:{}", config.endpoint_type, host, config.port)
}

/// Parse an endpoint back into its parts
pub fn get_endpoint_config(endpoint: &Endpoint) -> Result<EndpointConfig, FormatError> {
    parse_endpoint(&endpoint.0)
}

fn parse_endpoint(value: &str) -> Result<EndpointConfig, FormatError> {
    let invalid = || FormatError::InvalidEndpoint(value.to_string());
    let captures = ENDPOINT_PATTERN
        .as_ref()
        .and_then(|pattern| pattern.captures(value))
        .ok_or_else(invalid)?;

    let endpoint_type = captures[1].to_string();
    let raw_host = &captures[2];
    let host = match raw_host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        Some(inner) if !inner.is_empty() => inner.to_string(),
        Some(_) => return Err(invalid()),
        None if raw_host.contains(':') => return Err(invalid()),
        None => raw_host.to_string(),
    };
    if host.contains('[') || host.contains(']') {
        return Err(invalid());
    }
    let port = captures[3].parse::<u16>().map_err(|_| invalid())?;

    Ok(EndpointConfig {
        endpoint_type,
        host,
        port,
    })
}

impl Endpoint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// TCP endpoint for a socket address
    pub fn from_socket_addr(addr: &SocketAddr) -> Self {
        // IP literals always round-trip
        Endpoint(format_endpoint(&EndpointConfig::tcp(addr.ip().to_string(), addr.port())))
    }

    /// `host:port` form accepted by `TcpStream::connect`
    pub fn dial_address(&self) -> Result<String, FormatError> {
        let config = get_endpoint_config(self)?;
        if config.endpoint_type != TCP {
            return Err(FormatError::InvalidEndpoint(self.0.clone()));
        }
        Ok(if config.host.contains(':') {
            format!("[{}]:{}", config.host, config.port)
        } else {
            format!("{}:{}", config.host, config.port)
        })
    }
}

impl FromStr for Endpoint {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_endpoint(s)?;
        Ok(Endpoint(s.to_string()))
    }
}

impl TryFrom<String> for Endpoint {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_endpoint(&value)?;
        Ok(Endpoint(value))
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_create_and_parse_ipv4() {
        let endpoint = create_endpoint(&EndpointConfig::tcp("10.0.0.5", 10333)).unwrap();
        assert_eq!(endpoint.as_str(), "tcp://10.0.0.5:10333");
        assert_eq!(get_endpoint_config(&endpoint).unwrap(), EndpointConfig::tcp("10.0.0.5", 10333));
    }

    #[test]
    fn test_ipv6_is_bracketed() {
        let endpoint = create_endpoint(&EndpointConfig::tcp("::1", 20333)).unwrap();
        assert_eq!(endpoint.as_str(), "tcp://[::1]:20333");
        assert_eq!(get_endpoint_config(&endpoint).unwrap().host, "::1");
        assert_eq!(endpoint.dial_address().unwrap(), "[::1]:20333");
    }

    #[test]
    fn test_rejects_malformed() {
        for value in [
            "10.0.0.5:10333",
            "tcp://10.0.0.5",
            "tcp://::1:10333",
            "tcp://[]:1",
            "tcp://host:99999",
            "tcp1://host:1",
        ] {
            assert!(value.parse::<Endpoint>().is_err(), "{} should be rejected", value);
        }
    }

    #[test]
    fn test_create_rejects_parts_that_do_not_round_trip() {
        let configs = [
            EndpointConfig {
                endpoint_type: "tcp4".to_string(),
                host: "10.0.0.5".to_string(),
                port: 1,
            },
            EndpointConfig {
                endpoint_type: String::new(),
                host: "10.0.0.5".to_string(),
                port: 1,
            },
            EndpointConfig::tcp("[::1]", 1),
            EndpointConfig::tcp("host]", 1),
            EndpointConfig::tcp("[host", 1),
        ];
        for config in configs {
            assert!(
                matches!(create_endpoint(&config), Err(FormatError::InvalidEndpoint(_))),
                "{:?} should be rejected",
                config
            );
        }
    }

    #[test]
    fn test_from_socket_addr_round_trips() {
        for addr in ["127.0.0.1:20333", "[::1]:10333", "[fe80::1]:1"] {
            let addr: SocketAddr = addr.parse().unwrap();
            let endpoint = Endpoint::from_socket_addr(&addr);
            assert_eq!(endpoint.dial_address().unwrap().parse::<SocketAddr>().unwrap(), addr);
        }
    }

    #[test]
    fn test_serde_as_string() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            seeds: Vec<Endpoint>,
        }
        let parsed: Wrapper = toml::from_str(r#"seeds = ["tcp://seed1.example:10333"]"#).unwrap();
        assert_eq!(parsed.seeds[0].as_str(), "tcp://seed1.example:10333");
        assert!(toml::from_str::<Wrapper>(r#"seeds = ["nope"]"#).is_err());
    }

    fn host_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z0-9][a-z0-9.-]{0,30}",
            any::<[u8; 4]>().prop_map(|o| std::net::Ipv4Addr::from(o).to_string()),
            any::<[u8; 16]>().prop_map(|o| std::net::Ipv6Addr::from(o).to_string()),
        ]
    }

    proptest! {
        #[test]
        fn prop_endpoint_round_trip(
            endpoint_type in "[a-zA-Z]{1,8}",
            host in host_strategy(),
            port in any::<u16>(),
        ) {
            let config = EndpointConfig { endpoint_type, host, port };
            let endpoint = create_endpoint(&config).unwrap();
            prop_assert_eq!(get_endpoint_config(&endpoint).unwrap(), config);
        }
    }
}
