use crate::*;
use std::convert::TryFrom;

/// ICMP type and code values (RFC 792) this router sends or inspects.
pub mod icmpv4 {
    pub const ECHO_REPLY: u8 = 0;
    pub const DEST_UNREACHABLE: u8 = 3;
    pub const SOURCE_QUENCH: u8 = 4;
    pub const REDIRECT: u8 = 5;
    pub const ECHO_REQUEST: u8 = 8;
    pub const TIME_EXCEEDED: u8 = 11;
    pub const PARAM_PROBLEM: u8 = 12;

    pub const CODE_NET_UNREACHABLE: u8 = 0;
    pub const CODE_HOST_UNREACHABLE: u8 = 1;
    pub const CODE_TTL_EXPIRED: u8 = 0;

    /// Bytes of the offending datagram's payload carried after its header in an error message.
    pub const ERROR_PAYLOAD_BYTES: usize = 8;

    pub fn is_error_type(msg_type: u8) -> bool {
        match msg_type {
            DEST_UNREACHABLE | SOURCE_QUENCH | REDIRECT | TIME_EXCEEDED | PARAM_PROBLEM => true,
            _ => false,
        }
    }
}

/// The size of an ICMP "header", which precedes the data field
pub const ICMP_HEADER_LEN: usize = 8;

///
/// Ipv4Packet wrapper with getters/setters for the ICMP message in its payload
/// https://tools.ietf.org/html/rfc792
///
#[derive(Clone, Debug, PartialEq)]
pub struct Icmpv4Packet {
    packet: Ipv4Packet,
}

impl Packet for Icmpv4Packet {}

impl Icmpv4Packet {
    /// Builds an ICMP message inside a fresh IPv4 packet. The ICMP checksum is filled; the IPv4
    /// addresses, TTL and header checksum are left for the caller.
    pub fn new(msg_type: u8, code: u8, rest_of_header: [u8; 4], data: &[u8]) -> Self {
        let mut message = Vec::with_capacity(ICMP_HEADER_LEN + data.len());
        message.push(msg_type);
        message.push(code);
        message.extend_from_slice(&[0, 0]);
        message.extend_from_slice(&rest_of_header);
        message.extend_from_slice(data);

        let mut packet = Ipv4Packet::empty();
        packet.set_protocol(IpProtocol::ICMP);
        packet.set_payload(&message);

        let mut icmp = Icmpv4Packet { packet };
        icmp.fill_checksum();
        icmp
    }

    pub fn msg_type(&self) -> u8 {
        self.message()[0]
    }

    pub fn set_msg_type(&mut self, msg_type: u8) {
        self.packet.payload_mut()[0] = msg_type;
    }

    pub fn code(&self) -> u8 {
        self.message()[1]
    }

    pub fn set_code(&mut self, code: u8) {
        self.packet.payload_mut()[1] = code;
    }

    pub fn checksum(&self) -> u16 {
        let message = self.message();
        u16::from_be_bytes([message[2], message[3]])
    }

    pub fn rest_of_header(&self) -> [u8; 4] {
        let message = self.message();
        [message[4], message[5], message[6], message[7]]
    }

    pub fn data(&self) -> &[u8] {
        &self.message()[ICMP_HEADER_LEN..]
    }

    /// The checksum covers the whole ICMP message, header and data.
    pub fn validate_checksum(&self) -> bool {
        verify_checksum(self.message())
    }

    pub fn fill_checksum(&mut self) {
        let message = self.packet.payload_mut();
        message[2] = 0;
        message[3] = 0;
        let checksum = internet_checksum(message);
        message[2..4].copy_from_slice(&checksum.to_be_bytes());
    }

    pub fn ipv4(&self) -> &Ipv4Packet {
        &self.packet
    }

    pub fn ipv4_mut(&mut self) -> &mut Ipv4Packet {
        &mut self.packet
    }

    // Move ownership of the packet back to the caller
    pub fn packet(self) -> Ipv4Packet {
        self.packet
    }

    fn message(&self) -> &[u8] {
        &self.packet.data[self.packet.payload_offset..]
    }
}

impl TryFrom<Ipv4Packet> for Icmpv4Packet {
    type Error = &'static str;

    fn try_from(packet: Ipv4Packet) -> Result<Self, Self::Error> {
        if packet.protocol() != IpProtocol::ICMP {
            return Err("Packet does not carry ICMP");
        }
        if packet.payload().len() < ICMP_HEADER_LEN {
            return Err("Packet payload is too small for an ICMP header");
        }
        Ok(Icmpv4Packet { packet })
    }
}
