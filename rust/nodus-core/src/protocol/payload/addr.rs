// Addr - Annonce d'adresses de pairs
use crate::network::{get_endpoint_config, Endpoint, TCP};
use crate::wire::{sizes, BinaryReader, BinaryWriter, DeserializeWireContext, FormatError, SerializableWire};
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

/// Maximum addresses in one `addr` message
pub const MAX_ADDRESS_COUNT: usize = 200;

/// Peer address with the time it was last seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAddressWithTime {
    /// Seconds since the Unix epoch
    pub timestamp: u32,
    pub services: u64,
    /// IPv6 address; IPv4 peers use the mapped form
    pub address: [u8; 16],
    pub port: u16,
}

impl NetworkAddressWithTime {
    const SIZE: usize = sizes::SIZE_OF_U32 + sizes::SIZE_OF_U64 + 16 + sizes::SIZE_OF_U16;

    pub fn new(timestamp: u32, services: u64, ip: IpAddr, port: u16) -> Self {
        let v6 = match ip {
            IpAddr::V4(v4) => v4.to_ipv6_mapped(),
            IpAddr::V6(v6) => v6,
        };
        Self {
            timestamp,
            services,
            address: v6.octets(),
            port,
        }
    }

    /// Address of a TCP endpoint whose host is an IP literal
    pub fn from_endpoint(timestamp: u32, services: u64, endpoint: &Endpoint) -> Option<Self> {
        let config = get_endpoint_config(endpoint).ok()?;
        if config.endpoint_type != TCP {
            return None;
        }
        let ip: IpAddr = config.host.parse().ok()?;
        Some(Self::new(timestamp, services, ip, config.port))
    }

    pub fn ip(&self) -> IpAddr {
        let v6 = Ipv6Addr::from(self.address);
        match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::from_socket_addr(&SocketAddr::new(self.ip(), self.port))
    }
}

impl SerializableWire for NetworkAddressWithTime {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        writer
            .write_u32_le(self.timestamp)
            .write_u64_le(self.services)
            .write_bytes(&self.address)
            .write_u16_be(self.port);
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        _context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        let timestamp = reader.read_u32_le()?;
        let services = reader.read_u64_le()?;
        let mut address = [0u8; 16];
        address.copy_from_slice(reader.read_bytes(16)?);
        let port = reader.read_u16_be()?;
        Ok(Self {
            timestamp,
            services,
            address,
            port,
        })
    }

    fn size(&self) -> usize {
        Self::SIZE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddrPayload {
    pub addresses: Vec<NetworkAddressWithTime>,
}

impl SerializableWire for AddrPayload {
    fn serialize_wire_base(&self, writer: &mut BinaryWriter) {
        writer.write_array(&self.addresses, |w, address| address.serialize_wire_base(w));
    }

    fn deserialize_wire_base(
        reader: &mut BinaryReader<'_>,
        context: &DeserializeWireContext,
    ) -> Result<Self, FormatError> {
        let addresses = reader.read_array(MAX_ADDRESS_COUNT, |r| {
            NetworkAddressWithTime::deserialize_wire_base(r, context)
        })?;
        Ok(Self { addresses })
    }

    fn size(&self) -> usize {
        sizes::array(self.addresses.len(), self.addresses.len() * NetworkAddressWithTime::SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_is_big_endian() {
        let address = NetworkAddressWithTime::new(1, 1, "10.0.0.5".parse().unwrap(), 0x2a1d);
        let bytes = address.serialize_wire();
        assert_eq!(&bytes[bytes.len() - 2..], &[0x2a, 0x1d]);
    }

    #[test]
    fn test_ipv4_mapped_endpoint() {
        let endpoint: Endpoint = "tcp://10.0.0.5:10333".parse().unwrap();
        let address = NetworkAddressWithTime::from_endpoint(0, 1, &endpoint).unwrap();
        assert_eq!(address.endpoint(), endpoint);

        let v6: Endpoint = "tcp://[2001:db8::1]:20333".parse().unwrap();
        let address = NetworkAddressWithTime::from_endpoint(0, 1, &v6).unwrap();
        assert_eq!(address.endpoint(), v6);
    }

    #[test]
    fn test_hostname_has_no_address() {
        let endpoint: Endpoint = "tcp://seed.example:10333".parse().unwrap();
        assert!(NetworkAddressWithTime::from_endpoint(0, 1, &endpoint).is_none());
    }

    #[test]
    fn test_count_cap() {
        let payload = AddrPayload {
            addresses: vec![NetworkAddressWithTime::new(0, 0, "1.2.3.4".parse().unwrap(), 1); MAX_ADDRESS_COUNT + 1],
        };
        let bytes = payload.serialize_wire();
        assert!(AddrPayload::deserialize_wire(&bytes, &DeserializeWireContext::new(0)).is_err());
    }
}
