//! Bootstrap server list parsing.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A single `host:port` broker endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Errors produced while parsing a bootstrap server list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("bootstrap server list is empty")]
    Empty,

    #[error("empty entry at position {0} in bootstrap server list")]
    EmptyEntry(usize),

    #[error("missing port in '{0}'")]
    MissingPort(String),

    #[error("invalid port in '{0}'")]
    InvalidPort(String),
}

/// Ordered, non-empty list of bootstrap brokers.
///
/// Parsed from the comma-separated form (`"kafka-1:9092, kafka-2:9092"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapServers(Vec<BrokerAddress>);

impl BootstrapServers {
    pub fn parse(list: &str) -> Result<Self, AddressError> {
        if list.trim().is_empty() {
            return Err(AddressError::Empty);
        }

        let mut brokers = Vec::new();
        for (i, entry) in list.split(',').enumerate() {
            let entry = entry.trim();
            if entry.is_empty() {
                return Err(AddressError::EmptyEntry(i));
            }

            let (host, port) = entry
                .rsplit_once(':')
                .ok_or_else(|| AddressError::MissingPort(entry.to_string()))?;
            if host.is_empty() {
                return Err(AddressError::MissingPort(entry.to_string()));
            }
            let port: u16 = port
                .parse()
                .map_err(|_| AddressError::InvalidPort(entry.to_string()))?;
            if port == 0 {
                return Err(AddressError::InvalidPort(entry.to_string()));
            }

            // IPv6 literals come bracketed, e.g. "[::1]:9092"
            let host = host.trim_start_matches('[').trim_end_matches(']');
            brokers.push(BrokerAddress { host: host.to_string(), port });
        }

        Ok(Self(brokers))
    }

    pub fn brokers(&self) -> &[BrokerAddress] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for BootstrapServers {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BootstrapServers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, broker) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", broker)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let servers = BootstrapServers::parse("kafka-1:9092, kafka-2:19092").unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers.brokers()[0].host, "kafka-1");
        assert_eq!(servers.brokers()[1].port, 19092);
        assert_eq!(servers.to_string(), "kafka-1:9092,kafka-2:19092");
    }

    #[test]
    fn test_parse_ipv6() {
        let servers: BootstrapServers = "[::1]:9092".parse().unwrap();
        assert_eq!(servers.brokers()[0].host, "::1");
    }

    #[test]
    fn test_parse_rejects_bad_entries() {
        assert_eq!(BootstrapServers::parse("  "), Err(AddressError::Empty));
        assert_eq!(
            BootstrapServers::parse("a:1,,b:2"),
            Err(AddressError::EmptyEntry(1))
        );
        assert!(matches!(
            BootstrapServers::parse("kafka"),
            Err(AddressError::MissingPort(_))
        ));
        assert!(matches!(
            BootstrapServers::parse("kafka:port"),
            Err(AddressError::InvalidPort(_))
        ));
        assert!(matches!(
            BootstrapServers::parse("kafka:0"),
            Err(AddressError::InvalidPort(_))
        ));
    }
}
