use crate::*;
use std::borrow::Cow;
use std::convert::{TryFrom, TryInto};
use std::net::Ipv4Addr;

pub const IPV4_MIN_HEADER_LEN: usize = 20;

#[derive(Clone, Debug)]
pub struct Ipv4Packet {
    pub data: PacketData,
    pub layer2_offset: Option<usize>,
    pub layer3_offset: usize,
    pub payload_offset: usize,
}

impl Packet for Ipv4Packet {}

impl Ipv4Packet {
    /// Wraps `data` as an IPv4 packet whose header starts at `layer3_offset`.
    ///
    /// Bytes past the total length field are link layer padding and are cut off here, so that
    /// `payload()` is exactly the datagram's payload.
    pub fn from_buffer(
        mut data: PacketData,
        layer2_offset: Option<usize>,
        layer3_offset: usize,
    ) -> Result<Ipv4Packet, &'static str> {
        if data.len() < layer3_offset + IPV4_MIN_HEADER_LEN {
            return Err("Data is too short to be an IPv4 Packet");
        }

        let version: u8 = (data[layer3_offset] & 0xF0) >> 4;
        if version != 4 {
            return Err("Packet has incorrect version, is not Ipv4Packet");
        }

        // This is the header length in 32bit words
        let ihl = (data[layer3_offset] & 0x0F) as usize;
        if ihl < 5 {
            return Err("Packet has an IHL shorter than the minimum header");
        }
        let header_len = ihl * 4;

        let total_len = u16::from_be_bytes([data[layer3_offset + 2], data[layer3_offset + 3]]);
        let total_len = total_len as usize;
        if total_len < header_len || data.len() < layer3_offset + total_len {
            return Err("Packet has invalid total length field");
        }
        data.truncate(layer3_offset + total_len);

        Ok(Ipv4Packet {
            data,
            layer2_offset,
            layer3_offset,
            payload_offset: layer3_offset + header_len,
        })
    }

    /// Returns a 20 byte header with no payload, version and IHL filled in and everything else
    /// zeroed.
    pub fn empty() -> Ipv4Packet {
        let mut data = vec![0; IPV4_MIN_HEADER_LEN];
        data[0] = 0x45;
        data[3] = IPV4_MIN_HEADER_LEN as u8;
        Ipv4Packet {
            data,
            layer2_offset: None,
            layer3_offset: 0,
            payload_offset: IPV4_MIN_HEADER_LEN,
        }
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        let data: [u8; 4] = self.data[self.layer3_offset + 12..self.layer3_offset + 16]
            .try_into()
            .unwrap();
        Ipv4Addr::from(data)
    }

    pub fn set_src_addr(&mut self, addr: Ipv4Addr) {
        self.data[self.layer3_offset + 12..self.layer3_offset + 16].copy_from_slice(&addr.octets());
    }

    pub fn dest_addr(&self) -> Ipv4Addr {
        let data: [u8; 4] = self.data[self.layer3_offset + 16..self.layer3_offset + 20]
            .try_into()
            .unwrap();
        Ipv4Addr::from(data)
    }

    pub fn set_dest_addr(&mut self, addr: Ipv4Addr) {
        self.data[self.layer3_offset + 16..self.layer3_offset + 20].copy_from_slice(&addr.octets());
    }

    pub fn ihl(&self) -> u8 {
        self.data[self.layer3_offset] & 0x0F
    }

    pub fn header_len(&self) -> usize {
        self.payload_offset - self.layer3_offset
    }

    /// The header bytes, options included.
    pub fn header(&self) -> &[u8] {
        &self.data[self.layer3_offset..self.payload_offset]
    }

    pub fn payload(&self) -> Cow<[u8]> {
        Cow::from(&self.data[self.payload_offset..])
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.payload_offset..]
    }

    /// Replaces the payload and rewrites the total length field. The checksum is left alone,
    /// call `set_checksum` once the header is final.
    pub fn set_payload(&mut self, payload: &[u8]) {
        self.data.truncate(self.payload_offset);

        let total_len = (payload.len() + self.header_len()) as u16;
        self.data[self.layer3_offset + 2..=self.layer3_offset + 3]
            .copy_from_slice(&total_len.to_be_bytes());

        self.data.reserve_exact(payload.len());
        self.data.extend(payload);
    }

    /// The header followed by at most `payload_bytes` bytes of payload, as embedded in ICMP
    /// error messages.
    pub fn header_and_leading_payload(&self, payload_bytes: usize) -> &[u8] {
        let end = std::cmp::min(self.data.len(), self.payload_offset + payload_bytes);
        &self.data[self.layer3_offset..end]
    }

    pub fn protocol(&self) -> IpProtocol {
        IpProtocol::from(self.data[self.layer3_offset + 9])
    }

    pub fn set_protocol(&mut self, protocol: IpProtocol) {
        self.data[self.layer3_offset + 9] = protocol.into();
    }

    pub fn total_len(&self) -> u16 {
        u16::from_be_bytes(
            self.data[self.layer3_offset + 2..=self.layer3_offset + 3]
                .try_into()
                .unwrap(),
        )
    }

    pub fn ttl(&self) -> u8 {
        self.data[self.layer3_offset + 8]
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.data[self.layer3_offset + 8] = ttl;
    }

    /// Decrements the TTL by one and patches the header checksum for exactly that change, so
    /// the cost does not depend on the header length.
    pub fn decrement_ttl(&mut self) -> Result<u8, &'static str> {
        let ttl = self.ttl();
        if ttl == 0 {
            return Err("TTL is already zero");
        }
        let ttl_offset = self.layer3_offset + 8;
        let old_word = u16::from_be_bytes([self.data[ttl_offset], self.data[ttl_offset + 1]]);
        self.set_ttl(ttl - 1);
        let new_word = u16::from_be_bytes([self.data[ttl_offset], self.data[ttl_offset + 1]]);

        let checksum = incremental_update(self.checksum(), old_word, new_word);
        self.set_checksum_field(checksum);
        Ok(ttl - 1)
    }

    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes(
            self.data[self.layer3_offset + 10..=self.layer3_offset + 11]
                .try_into()
                .unwrap(),
        )
    }

    fn set_checksum_field(&mut self, checksum: u16) {
        self.data[self.layer3_offset + 10..=self.layer3_offset + 11]
            .copy_from_slice(&checksum.to_be_bytes());
    }

    pub fn dscp(&self) -> u8 {
        self.data[self.layer3_offset + 1] >> 2
    }

    pub fn identification(&self) -> u16 {
        u16::from_be_bytes(
            self.data[self.layer3_offset + 4..=self.layer3_offset + 5]
                .try_into()
                .unwrap(),
        )
    }

    pub fn fragment_offset(&self) -> u16 {
        u16::from_be_bytes([
            self.data[self.layer3_offset + 6] & 0x1F,
            self.data[self.layer3_offset + 7],
        ])
    }

    /// Returns tuple of (Don't Fragment, More Fragments)
    pub fn flags(&self) -> (bool, bool) {
        let df = (self.data[self.layer3_offset + 6] & 0x40) != 0;
        let mf = (self.data[self.layer3_offset + 6] & 0x20) != 0;
        (df, mf)
    }

    /// Verifies the IP header checksum.
    pub fn validate_checksum(&self) -> bool {
        verify_checksum(self.header())
    }

    /// Calculates what the checksum should be set to given the current header
    pub fn calculate_checksum(&self) -> u16 {
        // Sum around the checksum field, which sits on an even offset
        let header = self.header();
        let sum = u32::from(ones_complement_sum(&header[..10]))
            + u32::from(ones_complement_sum(&header[12..]));
        !(((sum & 0xFFFF) + (sum >> 16)) as u16)
    }

    /// Sets checksum field to valid value
    pub fn set_checksum(&mut self) {
        let new_checksum = self.calculate_checksum();
        self.set_checksum_field(new_checksum);
    }
}

/// Ipv4Packets are considered the same if they have the same data from the layer 3
/// header and onward. This function does not consider the data before the start of
/// the IPv4 header.
impl PartialEq for Ipv4Packet {
    fn eq(&self, other: &Self) -> bool {
        self.data[self.layer3_offset..] == other.data[other.layer3_offset..]
    }
}

impl Eq for Ipv4Packet {}

impl TryFrom<EthernetFrame> for Ipv4Packet {
    type Error = &'static str;

    fn try_from(frame: EthernetFrame) -> Result<Self, Self::Error> {
        if frame.ether_type() != IPV4_ETHER_TYPE {
            return Err("Frame does not have IPv4 ether type.");
        }
        Ipv4Packet::from_buffer(frame.data, Some(0), frame.payload_offset)
    }
}
