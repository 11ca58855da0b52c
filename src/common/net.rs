//! Network utility functions

use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use super::error::{RelayError, Result};

/// Parse a socket address
///
/// Accepts a literal `ip:port` or a resolvable `host:port`.
pub fn parse_socket_addr(addr: &str) -> Result<SocketAddr> {
    if let Ok(socket_addr) = SocketAddr::from_str(addr) {
        return Ok(socket_addr);
    }

    match addr.to_socket_addrs() {
        Ok(mut addrs) => addrs
            .next()
            .ok_or_else(|| RelayError::Config(format!("Failed to parse address: {}", addr))),
        Err(e) => Err(RelayError::Config(format!("Failed to parse address {}: {}", addr, e))),
    }
}

/// Check that `target` has the `host:port` shape without resolving it
///
/// Backend names are resolved on every dial attempt, so a name that does not
/// resolve yet is still a valid target.
pub fn is_host_port(target: &str) -> bool {
    match target.rsplit_once(':') {
        Some((host, port)) => {
            let host = host.trim_start_matches('[').trim_end_matches(']');
            !host.is_empty() && port.parse::<u16>().map_or(false, |p| p != 0)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_socket_addr() {
        let addr = parse_socket_addr("127.0.0.1:8080");
        assert!(addr.is_ok(), "Should be able to parse a valid address");
        assert_eq!(addr.unwrap().port(), 8080);

        let addr = parse_socket_addr("invalid-address");
        assert!(addr.is_err(), "Should fail to parse an invalid address");
    }

    #[test]
    fn test_is_host_port() {
        assert!(is_host_port("127.0.0.1:1521"));
        assert!(is_host_port("db.internal:1521"));
        assert!(is_host_port("[::1]:1521"));
        assert!(!is_host_port("db.internal"));
        assert!(!is_host_port(":1521"));
        assert!(!is_host_port("db.internal:0"));
        assert!(!is_host_port("db.internal:port"));
    }
}
