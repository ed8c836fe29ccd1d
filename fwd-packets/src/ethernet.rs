use crate::*;
use std::borrow::Cow;
use std::convert::{TryFrom, TryInto};

pub const ETHERNET_HEADER_LEN: usize = 14;

#[derive(Clone, Debug)]
pub struct EthernetFrame {
    pub data: PacketData,
    pub payload_offset: usize,
}

impl Packet for EthernetFrame {}

impl EthernetFrame {
    pub fn from_buffer(frame: PacketData) -> Result<EthernetFrame, &'static str> {
        // Ethernet II frames must be at least the header, which is 14bytes
        // 0                    6                    12                      14
        // |---6 byte Dest_MAC--|---6 byte Src_MAC---|--2 Byte EtherType---|
        if frame.len() < ETHERNET_HEADER_LEN {
            return Err("Frame is less than the minimum of 14 bytes");
        }

        Ok(EthernetFrame {
            data: frame,
            payload_offset: ETHERNET_HEADER_LEN,
        })
    }

    /// Returns an EthernetFrame with a zeroed header and no payload.
    pub fn empty() -> EthernetFrame {
        EthernetFrame {
            data: vec![0; ETHERNET_HEADER_LEN],
            payload_offset: ETHERNET_HEADER_LEN,
        }
    }

    pub fn dest_mac(&self) -> MacAddr {
        let bytes = <[u8; 6]>::try_from(&self.data[0..6]).unwrap();
        MacAddr::new(bytes)
    }

    pub fn src_mac(&self) -> MacAddr {
        let bytes = <[u8; 6]>::try_from(&self.data[6..12]).unwrap();
        MacAddr::new(bytes)
    }

    pub fn set_dest_mac(&mut self, mac: MacAddr) {
        self.data[..6].copy_from_slice(&mac.bytes);
    }

    pub fn set_src_mac(&mut self, mac: MacAddr) {
        self.data[6..12].copy_from_slice(&mac.bytes);
    }

    pub fn ether_type(&self) -> u16 {
        u16::from_be_bytes(self.data[12..=13].try_into().unwrap())
    }

    pub fn set_ether_type(&mut self, ether_type: u16) {
        self.data[12..=13].copy_from_slice(&ether_type.to_be_bytes());
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn payload(&self) -> Cow<[u8]> {
        Cow::from(&self.data[self.payload_offset..])
    }

    pub fn set_payload(&mut self, payload: &[u8]) {
        self.data.truncate(self.payload_offset);
        self.data.reserve_exact(payload.len());
        self.data.extend(payload);
    }

    pub fn encap_ipv4(ipv4: Ipv4Packet) -> EthernetFrame {
        let mut frame = EthernetFrame::empty();
        frame.set_payload(&ipv4.data[ipv4.layer3_offset..]);
        frame.set_ether_type(IPV4_ETHER_TYPE);
        frame
    }

    /// Moves the frame's bytes out, e.g. to hand them to a socket.
    pub fn into_inner(self) -> PacketData {
        self.data
    }
}

/// EthernetFrames are considered the same if they have the same bytes.
impl PartialEq for EthernetFrame {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for EthernetFrame {}

impl TryFrom<Ipv4Packet> for EthernetFrame {
    type Error = &'static str;

    fn try_from(packet: Ipv4Packet) -> Result<Self, Self::Error> {
        if packet.layer2_offset.is_some() {
            EthernetFrame::from_buffer(packet.data)
        } else {
            Err("IPv4 Packet does not contain an Ethernet Frame")
        }
    }
}

impl From<ArpFrame> for EthernetFrame {
    fn from(arp_frame: ArpFrame) -> Self {
        arp_frame.frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    #[test]
    fn ethernet_frame() {
        let data: Vec<u8> = vec![0xde, 0xad, 0xbe, 0xef, 0xff, 0xff, 1, 2, 3, 4, 5, 6, 0, 0];
        let frame = EthernetFrame::from_buffer(data).unwrap();
        assert_eq!(
            frame.dest_mac(),
            MacAddr::new([0xde, 0xad, 0xbe, 0xef, 0xff, 0xff])
        );
        assert_eq!(frame.src_mac(), MacAddr::new([1, 2, 3, 4, 5, 6]));
        assert_eq!(frame.ether_type(), 0);
        assert_eq!(frame.payload().len(), 0);
        assert_eq!(frame.len(), 14);
    }

    #[test]
    fn set_payload() {
        let data: Vec<u8> = vec![0xde, 0xad, 0xbe, 0xef, 0xff, 0xff, 1, 2, 3, 4, 5, 6, 0, 0];
        let mut frame = EthernetFrame::from_buffer(data).unwrap();

        let new_payload: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 7, 8, 9];
        frame.set_payload(&new_payload);
        assert_eq!(frame.payload(), new_payload);
        assert_eq!(frame.len(), 23);

        frame.set_payload(&[7]);
        assert_eq!(frame.payload(), vec![7]);
    }

    #[test]
    fn invalid_data_length() {
        let data: Vec<u8> = vec![0xde, 0xad, 0xbe, 0xef, 0xff, 0xff, 1, 2, 3, 4, 5, 6];
        assert_eq!(
            EthernetFrame::from_buffer(data),
            Err("Frame is less than the minimum of 14 bytes")
        );
    }

    #[test]
    fn set_macs() {
        let mut frame = EthernetFrame::empty();
        let new_dest = MacAddr::new([0x98, 0x88, 0x18, 0x12, 0xb4, 0xdf]);
        let new_src = MacAddr::new([0x98, 0x88, 0x18, 0x12, 0xb4, 0xe0]);
        frame.set_dest_mac(new_dest);
        frame.set_src_mac(new_src);
        assert_eq!(frame.dest_mac(), new_dest);
        assert_eq!(frame.src_mac(), new_src);
    }

    #[test]
    fn ether_type() {
        let data: Vec<u8> = vec![
            0xde, 0xad, 0xbe, 0xef, 0xff, 0xff, 1, 2, 3, 4, 5, 6, 0x08, 0x06,
        ];
        let frame = EthernetFrame::from_buffer(data).unwrap();
        assert_eq!(frame.ether_type(), ARP_ETHER_TYPE);
    }

    #[test]
    fn encap_ipv4() {
        let frame = EthernetFrame::encap_ipv4(Ipv4Packet::empty());
        assert_eq!(frame.payload_offset, 14);
        assert_eq!(frame.ether_type(), IPV4_ETHER_TYPE);
        assert_eq!(frame.len(), 34);
    }

    #[test]
    fn decap_encap_ipv4() {
        let frame = EthernetFrame::encap_ipv4(Ipv4Packet::empty());
        let packet = Ipv4Packet::try_from(frame.clone()).unwrap();
        assert_eq!(packet.layer2_offset, Some(0));
        assert_eq!(packet.layer3_offset, 14);
        assert_eq!(EthernetFrame::try_from(packet).unwrap(), frame);
    }
}
