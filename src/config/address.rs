//! Listen address and port validation
//!
//! A server listens on exactly one address family at a time. The port is
//! kept apart from the host so that it survives a change of family.

use crate::errors::{Error, Result};

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Highest value a TCP port can take
pub const MAX_PORT: u32 = 65535;

/// An address family a host can be parsed as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Inet,
    Inet6,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Family::Inet => f.write_str("IPv4"),
            Family::Inet6 => f.write_str("IPv6"),
        }
    }
}

/// The active host address, tagged by family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAddr {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
}

impl HostAddr {
    pub fn family(&self) -> Family {
        match *self {
            HostAddr::V4(_) => Family::Inet,
            HostAddr::V6(_) => Family::Inet6,
        }
    }
}

impl From<IpAddr> for HostAddr {
    fn from(ip: IpAddr) -> HostAddr {
        match ip {
            IpAddr::V4(v4) => HostAddr::V4(v4),
            IpAddr::V6(v6) => HostAddr::V6(v6),
        }
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            HostAddr::V4(ref addr) => fmt::Display::fmt(addr, f),
            HostAddr::V6(ref addr) => fmt::Display::fmt(addr, f),
        }
    }
}

/// Where a server listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    port: u16,
    host: HostAddr,
}

impl Default for Address {
    fn default() -> Address {
        Address {
            port: 0,
            host: HostAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }
}

impl Address {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn host(&self) -> HostAddr {
        self.host
    }

    /// The family currently in use
    pub fn family(&self) -> Family {
        self.host.family()
    }

    /// Whether `family` is the one currently in use
    pub fn is_active(&self, family: Family) -> bool {
        self.family() == family
    }

    /// The address in the form a listener binds to
    pub fn socket_addr(&self) -> SocketAddr {
        match self.host {
            HostAddr::V4(v4) => SocketAddr::new(IpAddr::V4(v4), self.port),
            HostAddr::V6(v6) => SocketAddr::new(IpAddr::V6(v6), self.port),
        }
    }

    /// Set the port, whichever family is or later becomes active.
    ///
    /// Fails with `PortOutOfRange` and leaves the port unchanged if `port`
    /// does not fit in 16 bits.
    pub fn set_port(&mut self, port: u32) -> Result<()> {
        self.port = validate_port(port)?;
        Ok(())
    }

    /// Parse `host` as an address of `family` and make it the active one.
    ///
    /// Fails with `InvalidHost` and leaves the address unchanged on bad input.
    pub fn set_host(&mut self, host: &str, family: Family) -> Result<()> {
        self.host = parse_host(host, family)?;
        Ok(())
    }
}

/// Check that `port` is a valid TCP port
pub fn validate_port(port: u32) -> Result<u16> {
    if port > MAX_PORT {
        return Err(Error::PortOutOfRange(port));
    }
    Ok(port as u16)
}

/// Parse textual `host` as a dotted-quad (`Inet`) or colon-hex (`Inet6`)
/// address.
pub fn parse_host(host: &str, family: Family) -> Result<HostAddr> {
    let invalid = || Error::InvalidHost {
        host: host.to_owned(),
        family,
    };

    match family {
        Family::Inet => host
            .parse::<Ipv4Addr>()
            .map(HostAddr::V4)
            .map_err(|_| invalid()),
        Family::Inet6 => host
            .parse::<Ipv6Addr>()
            .map(HostAddr::V6)
            .map_err(|_| invalid()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn port_bounds() {
        let mut addr = Address::default();

        assert!(addr.set_port(65535).is_ok());
        assert_eq!(addr.port(), 65535);

        match addr.set_port(65536) {
            Err(Error::PortOutOfRange(65536)) => (),
            other => panic!("{:?}", other),
        }
        assert_eq!(addr.port(), 65535);
    }

    #[test]
    fn port_survives_family_change() {
        let mut addr = Address::default();
        addr.set_port(8080).unwrap();
        addr.set_host("::1", Family::Inet6).unwrap();

        assert_eq!(addr.socket_addr(), "[::1]:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn families_are_exclusive() {
        let mut addr = Address::default();
        addr.set_host("10.0.0.1", Family::Inet).unwrap();
        assert!(addr.is_active(Family::Inet));

        addr.set_host("::1", Family::Inet6).unwrap();
        assert_eq!(addr.family(), Family::Inet6);
        assert!(!addr.is_active(Family::Inet));
        assert_eq!(addr.host(), HostAddr::V6(Ipv6Addr::LOCALHOST));
    }

    #[test]
    fn invalid_host_leaves_address_alone() {
        let mut addr = Address::default();
        addr.set_host("127.0.0.1", Family::Inet).unwrap();

        assert!(addr.set_host("::1", Family::Inet).is_err());
        assert!(addr.set_host("256.0.0.1", Family::Inet).is_err());
        assert!(addr.set_host("127.0.0.1", Family::Inet6).is_err());
        assert!(addr.set_host("localhost", Family::Inet6).is_err());

        assert_eq!(addr.host(), HostAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn default_listens_on_every_ipv4_interface() {
        let addr = Address::default();

        assert_eq!(addr.family(), Family::Inet);
        assert_eq!(addr.host().to_string(), "0.0.0.0");
        assert_eq!(addr.port(), 0);
    }
}
