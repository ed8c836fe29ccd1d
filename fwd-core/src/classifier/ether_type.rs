use crate::classifier::Classifier;
use fwd_packets::{EthernetFrame, ARP_ETHER_TYPE, IPV4_ETHER_TYPE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EtherType {
    Ipv4,
    Arp,
    Unsupported(u16),
}

/// Splits inbound frames by the payload type tag of their link layer header.
#[derive(Default)]
pub struct ByEtherType {}

impl ByEtherType {
    pub fn new() -> Self {
        ByEtherType {}
    }
}

impl Classifier for ByEtherType {
    type Packet = EthernetFrame;
    type Class = EtherType;

    fn classify(&self, frame: &Self::Packet) -> Self::Class {
        match frame.ether_type() {
            IPV4_ETHER_TYPE => EtherType::Ipv4,
            ARP_ETHER_TYPE => EtherType::Arp,
            other => EtherType::Unsupported(other),
        }
    }
}
