use crate::{EthernetFrame, MacAddr, ARP_ETHER_TYPE, IPV4_ETHER_TYPE};
use std::convert::{TryFrom, TryInto};
use std::net::Ipv4Addr;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

impl ArpOp {
    pub fn from_opcode(opcode: u16) -> Option<ArpOp> {
        match opcode {
            1 => Some(ArpOp::Request),
            2 => Some(ArpOp::Reply),
            _ => None,
        }
    }
}

pub enum ArpHardwareType {
    Ethernet = 1,
}

/// Length of an ARP message resolving IPv4 addresses to Ethernet addresses.
pub const ARP_IPV4_ETHERNET_LEN: usize = 28;

const HARDWARE_TYPE_RANGE: (usize, usize) = (0, 2);
const PROTOCOL_TYPE_RANGE: (usize, usize) = (2, 4);
const HARDWARE_ADDR_LEN_RANGE: (usize, usize) = (4, 5);
const PROTOCOL_ADDR_LEN_RANGE: (usize, usize) = (5, 6);
const OPCODE_RANGE: (usize, usize) = (6, 8);

///
/// EthernetFrame wrapper with getters/setters for the packet structure described in RFC 826
/// https://tools.ietf.org/html/rfc826
///
#[derive(Clone, Debug, PartialEq)]
pub struct ArpFrame {
    frame: EthernetFrame,
}

impl ArpFrame {
    /// An IPv4 over Ethernet ARP frame with the given opcode and every address zeroed.
    pub fn new_ipv4_ethernet(op: ArpOp) -> Self {
        let mut payload = vec![0; ARP_IPV4_ETHERNET_LEN];
        payload[0..2].copy_from_slice(&(ArpHardwareType::Ethernet as u16).to_be_bytes());
        payload[2..4].copy_from_slice(&IPV4_ETHER_TYPE.to_be_bytes());
        payload[4] = 6;
        payload[5] = 4;
        payload[6..8].copy_from_slice(&(op as u16).to_be_bytes());

        let mut frame = EthernetFrame::empty();
        frame.set_payload(payload.as_slice());
        frame.set_ether_type(ARP_ETHER_TYPE);
        ArpFrame { frame }
    }

    pub fn hardware_type(&self) -> u16 {
        let (start, end) = HARDWARE_TYPE_RANGE;
        u16::from_be_bytes(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn protocol_type(&self) -> u16 {
        let (start, end) = PROTOCOL_TYPE_RANGE;
        u16::from_be_bytes(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn hardware_addr_len(&self) -> u8 {
        let (start, _) = HARDWARE_ADDR_LEN_RANGE;
        self.arp_data(start, start + 1)[0]
    }

    pub fn protocol_addr_len(&self) -> u8 {
        let (start, _) = PROTOCOL_ADDR_LEN_RANGE;
        self.arp_data(start, start + 1)[0]
    }

    pub fn opcode(&self) -> u16 {
        let (start, end) = OPCODE_RANGE;
        u16::from_be_bytes(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn sender_hardware_addr(&self) -> &[u8] {
        let (start, end) = self.sender_hardware_addr_range();
        self.arp_data(start, end)
    }

    pub fn sender_protocol_addr(&self) -> &[u8] {
        let (start, end) = self.sender_protocol_addr_range();
        self.arp_data(start, end)
    }

    pub fn target_hardware_addr(&self) -> &[u8] {
        let (start, end) = self.target_hardware_addr_range();
        self.arp_data(start, end)
    }

    pub fn target_protocol_addr(&self) -> &[u8] {
        let (start, end) = self.target_protocol_addr_range();
        self.arp_data(start, end)
    }

    /// True when this frame maps IPv4 addresses to 48 bit Ethernet addresses, the only kind of
    /// resolution the typed accessors below understand.
    pub fn is_ipv4_over_ethernet(&self) -> bool {
        self.hardware_type() == ArpHardwareType::Ethernet as u16
            && self.protocol_type() == IPV4_ETHER_TYPE
            && self.hardware_addr_len() == 6
            && self.protocol_addr_len() == 4
    }

    pub fn sender_mac_addr(&self) -> Result<MacAddr, &'static str> {
        to_mac_addr(self.sender_hardware_addr())
    }

    pub fn sender_ipv4_addr(&self) -> Result<Ipv4Addr, &'static str> {
        to_ipv4_addr(self.sender_protocol_addr())
    }

    pub fn target_mac_addr(&self) -> Result<MacAddr, &'static str> {
        to_mac_addr(self.target_hardware_addr())
    }

    pub fn target_ipv4_addr(&self) -> Result<Ipv4Addr, &'static str> {
        to_ipv4_addr(self.target_protocol_addr())
    }

    pub fn set_hardware_type(&mut self, htype: u16) {
        let (start, end) = HARDWARE_TYPE_RANGE;
        self.set_arp_data(&htype.to_be_bytes(), start, end);
    }

    // The address setters assume a 6/4 address length layout, see `new_ipv4_ethernet`.
    pub fn set_sender_hardware_addr(&mut self, addr: MacAddr) {
        let (start, end) = self.sender_hardware_addr_range();
        self.set_arp_data(&addr.bytes, start, end);
    }

    pub fn set_sender_protocol_addr(&mut self, addr: Ipv4Addr) {
        let (start, end) = self.sender_protocol_addr_range();
        self.set_arp_data(&addr.octets(), start, end);
    }

    pub fn set_target_hardware_addr(&mut self, addr: MacAddr) {
        let (start, end) = self.target_hardware_addr_range();
        self.set_arp_data(&addr.bytes, start, end);
    }

    pub fn set_target_protocol_addr(&mut self, addr: Ipv4Addr) {
        let (start, end) = self.target_protocol_addr_range();
        self.set_arp_data(&addr.octets(), start, end);
    }

    /// Read access to the Ethernet header this ARP message rides in.
    pub fn ethernet(&self) -> &EthernetFrame {
        &self.frame
    }

    pub fn ethernet_mut(&mut self) -> &mut EthernetFrame {
        &mut self.frame
    }

    // Move ownership of the frame back to the caller
    pub fn frame(self) -> EthernetFrame {
        self.frame
    }

    // Returns the bytes in the ethernet frame between start and end, exclusive
    fn arp_data(&self, start: usize, end: usize) -> &[u8] {
        let frame_offset_start = self.frame.payload_offset + start;
        let frame_offset_end = self.frame.payload_offset + end;
        &self.frame.data[frame_offset_start..frame_offset_end]
    }

    fn set_arp_data(&mut self, bytes: &[u8], start: usize, end: usize) {
        let frame_offset_start = self.frame.payload_offset + start;
        let frame_offset_end = self.frame.payload_offset + end;
        self.frame.data[frame_offset_start..frame_offset_end].copy_from_slice(bytes);
    }

    fn sender_hardware_addr_range(&self) -> (usize, usize) {
        let hlen = self.hardware_addr_len() as usize;

        let start = 8;
        let end = start + hlen;
        (start, end)
    }

    fn sender_protocol_addr_range(&self) -> (usize, usize) {
        let hlen = self.hardware_addr_len() as usize;
        let plen = self.protocol_addr_len() as usize;

        let start = 8 + hlen;
        let end = start + plen;
        (start, end)
    }

    fn target_hardware_addr_range(&self) -> (usize, usize) {
        let hlen = self.hardware_addr_len() as usize;
        let plen = self.protocol_addr_len() as usize;

        let start = 8 + hlen + plen;
        let end = start + hlen;
        (start, end)
    }

    fn target_protocol_addr_range(&self) -> (usize, usize) {
        let hlen = self.hardware_addr_len() as usize;
        let plen = self.protocol_addr_len() as usize;

        let start = 8 + (2 * hlen) + plen;
        let end = start + plen;
        (start, end)
    }
}

fn to_mac_addr(bytes: &[u8]) -> Result<MacAddr, &'static str> {
    <[u8; 6]>::try_from(bytes)
        .map(MacAddr::new)
        .map_err(|_| "Hardware address is not a 48 bit Ethernet address")
}

fn to_ipv4_addr(bytes: &[u8]) -> Result<Ipv4Addr, &'static str> {
    <[u8; 4]>::try_from(bytes)
        .map(Ipv4Addr::from)
        .map_err(|_| "Protocol address is not an IPv4 address")
}

impl TryFrom<EthernetFrame> for ArpFrame {
    type Error = &'static str;

    ///
    /// Decorates the given EthernetFrame with ArpFrame getters/setters.
    /// Validates
    /// - The frame has an ARP ether type
    /// - The frame has a payload large enough for the hardware/protocol address lengths. Longer
    ///   payloads are accepted since short frames get padded on the wire.
    ///
    fn try_from(frame: EthernetFrame) -> Result<Self, Self::Error> {
        if frame.ether_type() != ARP_ETHER_TYPE {
            return Err("Frame does not have ARP ether type.");
        };

        let arp_frame = ArpFrame { frame };
        let payload_len = arp_frame.frame.payload().len();

        if payload_len < 8 {
            return Err("Frame payload is too small");
        }

        let hlen = arp_frame.hardware_addr_len() as usize;
        let plen = arp_frame.protocol_addr_len() as usize;

        if payload_len < (8 + (2 * hlen) + (2 * plen)) {
            return Err("Frame payload is shorter than its address length fields");
        }

        Ok(arp_frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arp_payload() -> Vec<u8> {
        vec![
            0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01, 1, 2, 3, 4, 5, 6, 10, 0, 0, 1, 10, 9,
            8, 7, 6, 5, 10, 0, 0, 2,
        ]
    }

    #[test]
    fn generate_empty_ipv4_ethernet_frame() {
        let arp_frame = ArpFrame::new_ipv4_ethernet(ArpOp::Reply);
        assert_eq!(arp_frame.ethernet().ether_type(), ARP_ETHER_TYPE);
        assert!(arp_frame.is_ipv4_over_ethernet());
        assert_eq!(arp_frame.opcode(), ArpOp::Reply as u16);
        assert_eq!(arp_frame.sender_hardware_addr(), [0, 0, 0, 0, 0, 0]);
        assert_eq!(arp_frame.sender_protocol_addr(), [0, 0, 0, 0]);
        assert_eq!(arp_frame.target_hardware_addr(), [0, 0, 0, 0, 0, 0]);
        assert_eq!(arp_frame.target_protocol_addr(), [0, 0, 0, 0]);
    }

    #[test]
    fn arp_frame_from_ethernet() -> Result<(), String> {
        let mut ethernet_frame = EthernetFrame::empty();
        ethernet_frame.set_payload(&arp_payload());
        ethernet_frame.set_ether_type(ARP_ETHER_TYPE);

        let arp_frame = ArpFrame::try_from(ethernet_frame)?;
        assert!(arp_frame.is_ipv4_over_ethernet());
        assert_eq!(arp_frame.opcode(), ArpOp::Request as u16);
        assert_eq!(arp_frame.sender_mac_addr()?, MacAddr::new([1, 2, 3, 4, 5, 6]));
        assert_eq!(arp_frame.sender_ipv4_addr()?, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(
            arp_frame.target_mac_addr()?,
            MacAddr::new([10, 9, 8, 7, 6, 5])
        );
        assert_eq!(arp_frame.target_ipv4_addr()?, Ipv4Addr::new(10, 0, 0, 2));
        Ok(())
    }

    #[test]
    fn padded_arp_frame_is_accepted() {
        let mut payload = arp_payload();
        payload.resize(46, 0);
        let mut ethernet_frame = EthernetFrame::empty();
        ethernet_frame.set_payload(&payload);
        ethernet_frame.set_ether_type(ARP_ETHER_TYPE);

        let arp_frame = ArpFrame::try_from(ethernet_frame).unwrap();
        assert_eq!(
            arp_frame.target_ipv4_addr().unwrap(),
            Ipv4Addr::new(10, 0, 0, 2)
        );
    }

    #[test]
    fn truncated_arp_frame_is_rejected() {
        let mut ethernet_frame = EthernetFrame::empty();
        ethernet_frame.set_payload(&arp_payload()[..20]);
        ethernet_frame.set_ether_type(ARP_ETHER_TYPE);

        assert_eq!(
            ArpFrame::try_from(ethernet_frame).unwrap_err(),
            "Frame payload is shorter than its address length fields"
        );
    }

    #[test]
    fn non_arp_ether_type_is_rejected() {
        let mut ethernet_frame = EthernetFrame::empty();
        ethernet_frame.set_payload(&arp_payload());
        ethernet_frame.set_ether_type(IPV4_ETHER_TYPE);

        assert!(ArpFrame::try_from(ethernet_frame).is_err());
    }

    #[test]
    fn non_ethernet_addresses_have_no_typed_view() {
        let mut payload = vec![0x00, 0x01, 0x08, 0x00, 8, 4, 0x00, 0x01];
        payload.resize(8 + 2 * 8 + 2 * 4, 0);
        let mut ethernet_frame = EthernetFrame::empty();
        ethernet_frame.set_payload(&payload);
        ethernet_frame.set_ether_type(ARP_ETHER_TYPE);

        let arp_frame = ArpFrame::try_from(ethernet_frame).unwrap();
        assert!(!arp_frame.is_ipv4_over_ethernet());
        assert!(arp_frame.sender_mac_addr().is_err());
        assert!(arp_frame.sender_ipv4_addr().is_ok());
    }

    #[test]
    fn request_fields_survive_a_reparse() {
        let mut request = ArpFrame::new_ipv4_ethernet(ArpOp::Request);
        request.set_sender_hardware_addr(MacAddr::new([2, 0, 0, 0, 0, 1]));
        request.set_sender_protocol_addr(Ipv4Addr::new(192, 168, 1, 1));
        request.set_target_hardware_addr(MacAddr::ZERO);
        request.set_target_protocol_addr(Ipv4Addr::new(192, 168, 1, 20));

        let reparsed = ArpFrame::try_from(request.clone().frame()).unwrap();
        assert_eq!(reparsed.ethernet().len(), 14 + ARP_IPV4_ETHERNET_LEN);
        assert_eq!(ArpOp::from_opcode(reparsed.opcode()), Some(ArpOp::Request));
        assert_eq!(reparsed.sender_mac_addr(), request.sender_mac_addr());
        assert_eq!(reparsed.sender_ipv4_addr(), request.sender_ipv4_addr());
        assert_eq!(reparsed.target_ipv4_addr(), request.target_ipv4_addr());
    }
}
